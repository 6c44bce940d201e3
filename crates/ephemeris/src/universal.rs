//! Universal-variable propagation of an arbitrary conic state.
//!
//! Advances (r₀, v₀) by Δt about a central μ without going through classical
//! elements, so elliptic and hyperbolic arcs (Lambert legs, mission cruises)
//! share one code path. Stumpff functions C(z) and S(z) switch between the
//! conic regimes, with Taylor expansions near z = 0 for stability.

use orbit_core::vector::{self, Vector3};

use crate::EphemerisError;

const MAX_ITERATIONS: u32 = 50;
const TOLERANCE: f64 = 1e-10;

/// Stumpff function C(z).
pub fn stumpff_c(z: f64) -> f64 {
    if z > 1e-4 {
        let sqrt_z = z.sqrt();
        (1.0 - sqrt_z.cos()) / z
    } else if z < -1e-4 {
        let sqrt_neg_z = (-z).sqrt();
        (sqrt_neg_z.cosh() - 1.0) / (-z)
    } else {
        // Parabolic limit: Taylor expansion.
        0.5 - z / 24.0 + z * z / 720.0 - z * z * z / 40_320.0
    }
}

/// Stumpff function S(z).
pub fn stumpff_s(z: f64) -> f64 {
    if z > 1e-4 {
        let sqrt_z = z.sqrt();
        (sqrt_z - sqrt_z.sin()) / sqrt_z.powi(3)
    } else if z < -1e-4 {
        let sqrt_neg_z = (-z).sqrt();
        (sqrt_neg_z.sinh() - sqrt_neg_z) / sqrt_neg_z.powi(3)
    } else {
        1.0 / 6.0 - z / 120.0 + z * z / 5_040.0 - z * z * z / 362_880.0
    }
}

/// Propagate a conic state by `dt_s` seconds about a body with parameter
/// `mu` (m³/s²).
///
/// Newton iteration on the universal anomaly χ, then position and velocity
/// from the Lagrange f and g coefficients.
pub fn propagate_state(
    r0: &Vector3,
    v0: &Vector3,
    dt_s: f64,
    mu: f64,
) -> Result<(Vector3, Vector3), EphemerisError> {
    if dt_s == 0.0 {
        return Ok((*r0, *v0));
    }

    let r0_norm = vector::norm(r0);
    let v0_norm = vector::norm(v0);
    let sqrt_mu = mu.sqrt();
    // Reciprocal semi-major axis; sign selects the conic regime.
    let alpha = 2.0 / r0_norm - v0_norm * v0_norm / mu;
    let vr0 = vector::dot(r0, v0) / r0_norm;

    let mut chi = if alpha > 1e-12 {
        sqrt_mu * dt_s * alpha
    } else {
        // Parabolic/hyperbolic starter; refined by the Newton loop.
        dt_s.signum() * sqrt_mu * dt_s.abs() / r0_norm
    };

    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        let z = alpha * chi * chi;
        let c = stumpff_c(z);
        let s = stumpff_s(z);
        let chi2 = chi * chi;

        let f = r0_norm * vr0 / sqrt_mu * chi2 * c
            + (1.0 - alpha * r0_norm) * chi2 * chi * s
            + r0_norm * chi
            - sqrt_mu * dt_s;
        let f_prime = r0_norm * vr0 / sqrt_mu * chi * (1.0 - z * s)
            + (1.0 - alpha * r0_norm) * chi2 * c
            + r0_norm;

        let delta = f / f_prime;
        chi -= delta;
        if delta.abs() < TOLERANCE * (1.0 + chi.abs()) {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(EphemerisError::ConvergenceFailure {
            context: "universal-variable propagation",
            iterations: MAX_ITERATIONS,
        });
    }

    let z = alpha * chi * chi;
    let c = stumpff_c(z);
    let s = stumpff_s(z);
    let chi2 = chi * chi;

    let f = 1.0 - chi2 / r0_norm * c;
    let g = dt_s - chi2 * chi / sqrt_mu * s;
    let position = vector::add(&vector::scale(r0, f), &vector::scale(v0, g));
    let r_norm = vector::norm(&position);

    let f_dot = sqrt_mu / (r0_norm * r_norm) * chi * (z * s - 1.0);
    let g_dot = 1.0 - chi2 / r_norm * c;
    let velocity = vector::add(&vector::scale(r0, f_dot), &vector::scale(v0, g_dot));

    Ok((position, velocity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MU_SUN_M3_S2;
    use orbit_core::constants::AU_M;

    #[test]
    fn stumpff_functions_are_continuous_at_zero() {
        assert!((stumpff_c(1e-5) - 0.5).abs() < 1e-5);
        assert!((stumpff_c(-1e-5) - 0.5).abs() < 1e-5);
        assert!((stumpff_s(1e-5) - 1.0 / 6.0).abs() < 1e-5);
        assert!((stumpff_s(-1e-5) - 1.0 / 6.0).abs() < 1e-5);
    }

    #[test]
    fn circular_orbit_advances_by_quarter_period() {
        let r0 = [AU_M, 0.0, 0.0];
        let v_circ = (MU_SUN_M3_S2 / AU_M).sqrt();
        let v0 = [0.0, v_circ, 0.0];
        let period = std::f64::consts::TAU * (AU_M.powi(3) / MU_SUN_M3_S2).sqrt();

        let (r, v) = propagate_state(&r0, &v0, period / 4.0, MU_SUN_M3_S2).expect("propagate");
        assert!((r[0] / AU_M).abs() < 1e-6, "x should vanish, got {}", r[0]);
        assert!((r[1] / AU_M - 1.0).abs() < 1e-6, "y should be 1 AU");
        assert!((v[0] + v_circ).abs() / v_circ < 1e-6, "vx should be -v_circ");
    }

    #[test]
    fn full_period_returns_to_start() {
        let r0 = [0.7 * AU_M, 0.4 * AU_M, 0.1 * AU_M];
        let v0 = [-15_000.0, 28_000.0, 500.0];
        let r0_norm = vector::norm(&r0);
        let v0_norm = vector::norm(&v0);
        let alpha = 2.0 / r0_norm - v0_norm * v0_norm / MU_SUN_M3_S2;
        let a = 1.0 / alpha;
        let period = std::f64::consts::TAU * (a.powi(3) / MU_SUN_M3_S2).sqrt();

        let (r, _) = propagate_state(&r0, &v0, period, MU_SUN_M3_S2).expect("propagate");
        let error = vector::norm(&vector::sub(&r, &r0));
        assert!(error < 1.0e3, "periodicity error {error} m");
    }

    #[test]
    fn hyperbolic_state_escapes() {
        let r0 = [AU_M, 0.0, 0.0];
        let v_esc = (2.0 * MU_SUN_M3_S2 / AU_M).sqrt();
        let v0 = [0.0, 1.2 * v_esc, 0.0];
        let (r, _) = propagate_state(&r0, &v0, 200.0 * 86_400.0, MU_SUN_M3_S2).expect("propagate");
        assert!(vector::norm(&r) > 1.5 * AU_M);
    }
}
