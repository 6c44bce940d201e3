//! Kepler's equation and element-based propagation.
//!
//! `propagate` turns (body, seconds since epoch) into a heliocentric state:
//! mean anomaly from the epoch elements, eccentric anomaly by Newton
//! iteration on M = E − e·sin E, true anomaly via the half-angle identity,
//! then a ω → i → Ω rotation chain out of the perifocal frame. Velocity is
//! analytic from Ė = n/(1 − e·cos E); nothing is finite-differenced.

use std::f64::consts::TAU;

use orbit_core::vector::Vector3;

use crate::data::Body;
use crate::{BodyState, EphemerisError};

/// Convergence threshold on |ΔE| (rad).
pub const KEPLER_TOLERANCE: f64 = 1e-12;

/// Iteration cap for the Newton solve.
pub const KEPLER_MAX_ITERATIONS: u32 = 50;

/// Solve Kepler's equation M = E − e·sin E for the eccentric anomaly.
///
/// Newton iteration starting from E₀ = M. Valid for elliptic orbits
/// (0 ≤ e < 1), which the catalog guarantees.
pub fn solve_kepler(mean_anomaly: f64, e: f64) -> Result<f64, EphemerisError> {
    let m = mean_anomaly.rem_euclid(TAU);
    let mut big_e = m;

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = big_e - e * big_e.sin() - m;
        let f_prime = 1.0 - e * big_e.cos();
        let delta = f / f_prime;
        big_e -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            return Ok(big_e);
        }
    }

    Err(EphemerisError::ConvergenceFailure {
        context: "Kepler solver",
        iterations: KEPLER_MAX_ITERATIONS,
    })
}

/// Heliocentric state of `body` at `t_s` seconds since epoch J2000.
///
/// Pure: identical inputs give identical output. The Sun is pinned to the
/// frame origin.
pub fn propagate(body: Body, t_s: f64) -> Result<BodyState, EphemerisError> {
    let Some(el) = body.elements() else {
        return Ok(BodyState::at_rest(body));
    };

    let n = el.mean_motion();
    let mean_anomaly = el.m0_rad + n * t_s;
    let big_e = solve_kepler(mean_anomaly, el.e)?;

    let (sin_e, cos_e) = big_e.sin_cos();
    let nu = 2.0 * ((1.0 + el.e).sqrt() * (big_e / 2.0).sin())
        .atan2((1.0 - el.e).sqrt() * (big_e / 2.0).cos());
    let r = el.a_m * (1.0 - el.e * el.e) / (1.0 + el.e * nu.cos());

    // Perifocal coordinates: x toward periapsis, z along orbit normal.
    let position_pf = [r * nu.cos(), r * nu.sin(), 0.0];
    let e_dot = n / (1.0 - el.e * cos_e);
    let velocity_pf = [
        -el.a_m * sin_e * e_dot,
        el.a_m * (1.0 - el.e * el.e).sqrt() * cos_e * e_dot,
        0.0,
    ];

    Ok(BodyState {
        body,
        position_m: perifocal_to_ecliptic(&position_pf, el.node_rad, el.i_rad, el.argp_rad),
        velocity_m_s: perifocal_to_ecliptic(&velocity_pf, el.node_rad, el.i_rad, el.argp_rad),
    })
}

/// Rotate a perifocal vector into the heliocentric ecliptic frame:
/// Rz(Ω) · Rx(i) · Rz(ω).
fn perifocal_to_ecliptic(v: &Vector3, node: f64, inc: f64, argp: f64) -> Vector3 {
    let v = rotate_z(v, argp);
    let v = rotate_x(&v, inc);
    rotate_z(&v, node)
}

fn rotate_z(v: &Vector3, angle: f64) -> Vector3 {
    let (sin, cos) = angle.sin_cos();
    [v[0] * cos - v[1] * sin, v[0] * sin + v[1] * cos, v[2]]
}

fn rotate_x(v: &Vector3, angle: f64) -> Vector3 {
    let (sin, cos) = angle.sin_cos();
    [v[0], v[1] * cos - v[2] * sin, v[1] * sin + v[2] * cos]
}

#[cfg(test)]
mod tests {
    use orbit_core::constants::AU_M;
    use orbit_core::vector;

    use super::*;

    #[test]
    fn kepler_solution_satisfies_equation() {
        for &(m, e) in &[(0.3, 0.0167), (2.8, 0.2056), (5.9, 0.0934), (0.0, 0.5)] {
            let big_e = solve_kepler(m, e).expect("converges");
            let residual = big_e - e * big_e.sin() - m.rem_euclid(TAU);
            assert!(residual.abs() < 1e-11, "residual {residual} for M={m}, e={e}");
        }
    }

    #[test]
    fn sun_stays_at_origin() {
        let state = propagate(Body::Sun, 1.0e9).expect("sun state");
        assert_eq!(state.position_m, [0.0; 3]);
        assert_eq!(state.velocity_m_s, [0.0; 3]);
    }

    #[test]
    fn earth_stays_near_one_au() {
        for step in 0..12 {
            let t = f64::from(step) * 30.0 * 86_400.0;
            let state = propagate(Body::Earth, t).expect("earth state");
            let r_au = vector::norm(&state.position_m) / AU_M;
            assert!((0.98..1.02).contains(&r_au), "r = {r_au} AU at t = {t}");
        }
    }

    #[test]
    fn propagation_is_referentially_transparent() {
        let a = propagate(Body::Mars, 123_456.789).expect("state");
        let b = propagate(Body::Mars, 123_456.789).expect("state");
        assert_eq!(a.position_m, b.position_m);
        assert_eq!(a.velocity_m_s, b.velocity_m_s);
    }
}
