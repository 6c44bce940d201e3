//! Lambert's problem: given two heliocentric positions and a time of flight,
//! find the terminal velocities of the connecting conic.
//!
//! Universal-variable formulation after Izzo. The transfer is reduced to one
//! scalar unknown x with the geometry folded into λ = ±√(1 − c/s); the time
//! equation T(x, λ) = T* is driven to its root with a third-order Householder
//! step, bracketed so a bad step degrades to bisection instead of leaving the
//! solution interval. Zero-revolution transfers start from x₀ = 0;
//! multi-revolution classes are solved on both branches around the time
//! minimum of the class.

use std::f64::consts::PI;

use orbit_core::vector::{self, Vector3};
use thiserror::Error;

/// Residual tolerance on the non-dimensional time equation.
const TIME_TOLERANCE: f64 = 1e-8;

/// Iteration cap for the root search.
const MAX_ITERATIONS: u32 = 35;

/// Largest revolution count the solver will attempt.
const MAX_REVOLUTIONS: u32 = 16;

/// Relative cross-product threshold below which the transfer plane is
/// considered undefined.
const PLANE_EPSILON: f64 = 1e-11;

/// Errors surfaced by the Lambert solver.
#[derive(Debug, Error)]
pub enum LambertError {
    #[error("time of flight must be positive, got {0} s")]
    InvalidTimeOfFlight(f64),
    #[error("transfer geometry is degenerate: {0}")]
    DegenerateGeometry(&'static str),
    #[error("no converged solution for the requested transfer")]
    ConvergenceFailure,
    #[error("{requested} revolutions exceeds the supported maximum of {max}")]
    UnsupportedRevolutions { requested: u32, max: u32 },
}

/// One solution of the boundary-value problem.
#[derive(Debug, Clone, Copy)]
pub struct LambertSolution {
    /// Velocity at the first position (m/s).
    pub v1: Vector3,
    /// Velocity at the second position (m/s).
    pub v2: Vector3,
    /// Complete revolutions between the endpoints.
    pub revolutions: u32,
}

/// Solve for the requested revolution class.
///
/// Positions in metres, `tof_s` in seconds, `mu` in m³/s². For
/// `revolutions == 0` the solution is unique; for higher classes the right
/// branch (larger x) is returned, and `solutions` exposes both. `prograde`
/// selects the transfer sense relative to +z of the frame.
pub fn solve(
    r1: &Vector3,
    r2: &Vector3,
    tof_s: f64,
    mu: f64,
    prograde: bool,
    revolutions: u32,
) -> Result<LambertSolution, LambertError> {
    if revolutions > MAX_REVOLUTIONS {
        return Err(LambertError::UnsupportedRevolutions {
            requested: revolutions,
            max: MAX_REVOLUTIONS,
        });
    }
    let geometry = Geometry::new(r1, r2, tof_s, mu, prograde)?;
    if revolutions == 0 {
        let x = solve_zero_rev(&geometry)?;
        return Ok(geometry.reconstruct(x, 0));
    }
    let (_, x_right) = solve_multi_rev(&geometry, revolutions)?;
    Ok(geometry.reconstruct(x_right, revolutions))
}

/// Enumerate every prograde-sense solution up to `max_revolutions`.
///
/// The zero-revolution solution comes first, then both branches of each
/// feasible multi-revolution class in ascending order. Classes whose time
/// minimum exceeds the requested time of flight terminate the enumeration.
pub fn solutions(
    r1: &Vector3,
    r2: &Vector3,
    tof_s: f64,
    mu: f64,
    prograde: bool,
    max_revolutions: u32,
) -> Result<Vec<LambertSolution>, LambertError> {
    let geometry = Geometry::new(r1, r2, tof_s, mu, prograde)?;
    let mut found = Vec::new();

    if let Ok(x) = solve_zero_rev(&geometry) {
        found.push(geometry.reconstruct(x, 0));
    }

    for revs in 1..=max_revolutions.min(MAX_REVOLUTIONS) {
        match solve_multi_rev(&geometry, revs) {
            Ok((x_left, x_right)) => {
                found.push(geometry.reconstruct(x_left, revs));
                found.push(geometry.reconstruct(x_right, revs));
            }
            // The time minimum grows with the class; no later class fits.
            Err(_) => break,
        }
    }

    if found.is_empty() {
        return Err(LambertError::ConvergenceFailure);
    }
    Ok(found)
}

/// Transfer geometry reduced to the Izzo parameters.
struct Geometry {
    r1n: f64,
    r2n: f64,
    chord: f64,
    semi_perimeter: f64,
    lambda: f64,
    /// Non-dimensional target time T* = τ·√(2μ/s³).
    t_star: f64,
    mu: f64,
    i_r1: Vector3,
    i_r2: Vector3,
    i_t1: Vector3,
    i_t2: Vector3,
}

impl Geometry {
    fn new(
        r1: &Vector3,
        r2: &Vector3,
        tof_s: f64,
        mu: f64,
        prograde: bool,
    ) -> Result<Self, LambertError> {
        if tof_s <= 0.0 {
            return Err(LambertError::InvalidTimeOfFlight(tof_s));
        }

        let r1n = vector::norm(r1);
        let r2n = vector::norm(r2);
        if r1n == 0.0 || r2n == 0.0 {
            return Err(LambertError::DegenerateGeometry(
                "zero-magnitude position vector",
            ));
        }

        let chord = vector::norm(&vector::sub(r2, r1));
        let semi_perimeter = 0.5 * (r1n + r2n + chord);

        let i_r1 = vector::scale(r1, 1.0 / r1n);
        let i_r2 = vector::scale(r2, 1.0 / r2n);
        let plane = vector::cross(&i_r1, &i_r2);
        let plane_norm = vector::norm(&plane);
        if plane_norm < PLANE_EPSILON {
            // Collinear endpoints: the transfer plane is undefined, which
            // covers the antiparallel 180° case and coincident positions.
            return Err(LambertError::DegenerateGeometry(
                "collinear position vectors leave the transfer plane undefined",
            ));
        }
        let i_h = vector::scale(&plane, 1.0 / plane_norm);

        let mut lambda = (1.0 - chord / semi_perimeter).max(0.0).sqrt();
        let (mut i_t1, mut i_t2) = if i_h[2] < 0.0 {
            // Transfer angle beyond π for the prograde sense.
            lambda = -lambda;
            (vector::cross(&i_r1, &i_h), vector::cross(&i_r2, &i_h))
        } else {
            (vector::cross(&i_h, &i_r1), vector::cross(&i_h, &i_r2))
        };
        if !prograde {
            lambda = -lambda;
            i_t1 = vector::scale(&i_t1, -1.0);
            i_t2 = vector::scale(&i_t2, -1.0);
        }

        let t_star = tof_s * (2.0 * mu / semi_perimeter.powi(3)).sqrt();

        Ok(Self {
            r1n,
            r2n,
            chord,
            semi_perimeter,
            lambda,
            t_star,
            mu,
            i_r1,
            i_r2,
            i_t1,
            i_t2,
        })
    }

    /// Terminal velocities from a converged x, via the radial/tangential
    /// decomposition at both endpoints.
    fn reconstruct(&self, x: f64, revolutions: u32) -> LambertSolution {
        let lambda = self.lambda;
        let y = (1.0 - lambda * lambda * (1.0 - x * x)).sqrt();
        let gamma = (self.mu * self.semi_perimeter / 2.0).sqrt();
        let rho = (self.r1n - self.r2n) / self.chord;
        let sigma = (1.0 - rho * rho).max(0.0).sqrt();

        let radial_1 = gamma * ((lambda * y - x) - rho * (lambda * y + x)) / self.r1n;
        let radial_2 = -gamma * ((lambda * y - x) + rho * (lambda * y + x)) / self.r2n;
        let tangential_1 = gamma * sigma * (y + lambda * x) / self.r1n;
        let tangential_2 = gamma * sigma * (y + lambda * x) / self.r2n;

        let v1 = vector::add(
            &vector::scale(&self.i_r1, radial_1),
            &vector::scale(&self.i_t1, tangential_1),
        );
        let v2 = vector::add(
            &vector::scale(&self.i_r2, radial_2),
            &vector::scale(&self.i_t2, tangential_2),
        );

        LambertSolution {
            v1,
            v2,
            revolutions,
        }
    }
}

/// Non-dimensional time of flight T(x, λ) for the given revolution count.
fn time_of_flight(x: f64, lambda: f64, revolutions: u32) -> f64 {
    let m = f64::from(revolutions);
    // Battin's series is better conditioned near the parabola.
    if revolutions == 0 && (0.6f64.sqrt()..1.4f64.sqrt()).contains(&x) {
        let y = (1.0 - lambda * lambda * (1.0 - x * x)).sqrt();
        let eta = y - lambda * x;
        let s1 = 0.5 * (1.0 - lambda - x * eta);
        let q = 4.0 / 3.0 * hyp2f1b(s1);
        return 0.5 * (eta.powi(3) * q + 4.0 * lambda * eta);
    }

    let one_minus_x2 = 1.0 - x * x;
    let y = (1.0 - lambda * lambda * one_minus_x2).sqrt();
    let psi = if x < 1.0 {
        // Elliptic.
        (x * y + lambda * one_minus_x2).clamp(-1.0, 1.0).acos()
    } else {
        // Hyperbolic.
        ((y - x * lambda) * (x * x - 1.0).sqrt()).asinh()
    };
    ((psi + m * PI) / one_minus_x2.abs().sqrt() - x + lambda * y) / one_minus_x2
}

/// First three derivatives of T with respect to x.
fn time_derivatives(x: f64, lambda: f64, t: f64) -> (f64, f64, f64) {
    let one_minus_x2 = 1.0 - x * x;
    let y = (1.0 - lambda * lambda * one_minus_x2).sqrt();
    let l2 = lambda * lambda;
    let l3 = l2 * lambda;
    let l5 = l3 * l2;

    let dt = (3.0 * t * x - 2.0 + 2.0 * l3 * x / y) / one_minus_x2;
    let d2t = (3.0 * t + 5.0 * x * dt + 2.0 * (1.0 - l2) * l3 / y.powi(3)) / one_minus_x2;
    let d3t = (7.0 * x * d2t + 8.0 * dt - 6.0 * (1.0 - l2) * l5 * x / y.powi(5)) / one_minus_x2;
    (dt, d2t, d3t)
}

/// Gauss hypergeometric ₂F₁(3, 1; 5/2; x) by direct series summation.
fn hyp2f1b(x: f64) -> f64 {
    let mut result = 1.0;
    let mut term = 1.0;
    let mut k = 0.0;
    loop {
        term *= (3.0 + k) * (1.0 + k) / ((2.5 + k) * (1.0 + k)) * x;
        result += term;
        if term.abs() < 1e-12 || k > 200.0 {
            return result;
        }
        k += 1.0;
    }
}

/// Zero-revolution root: T is strictly decreasing in x, so the Householder
/// iteration runs inside a monotone bracket.
fn solve_zero_rev(geometry: &Geometry) -> Result<f64, LambertError> {
    let lambda = geometry.lambda;
    let t_star = geometry.t_star;

    // Expand the right edge until it is on the fast side of the target.
    let lo = -1.0 + 1e-12;
    let mut hi = 1.0 + 1e-9;
    let mut expansions = 0;
    while time_of_flight(hi, lambda, 0) > t_star {
        hi = hi * 2.0 + 1.0;
        expansions += 1;
        if expansions > 60 {
            return Err(LambertError::ConvergenceFailure);
        }
    }

    householder(lambda, t_star, 0, 0.0, (lo, hi), Monotonicity::Decreasing)
}

/// Both branches of a multi-revolution class, left (long-period) then right
/// (short-period). Fails when the class minimum exceeds T*.
fn solve_multi_rev(geometry: &Geometry, revolutions: u32) -> Result<(f64, f64), LambertError> {
    let lambda = geometry.lambda;
    let t_star = geometry.t_star;

    let (x_min, t_min) = class_minimum(lambda, revolutions)?;
    if t_star < t_min - TIME_TOLERANCE || x_min <= -1.0 + 1e-9 || x_min >= 1.0 - 1e-9 {
        return Err(LambertError::ConvergenceFailure);
    }

    let m = f64::from(revolutions);
    let left_seed = {
        let term = ((m * PI + PI) / (8.0 * t_star)).powf(2.0 / 3.0);
        (term - 1.0) / (term + 1.0)
    };
    let right_seed = {
        let term = ((8.0 * t_star) / (m * PI)).powf(2.0 / 3.0);
        (term - 1.0) / (term + 1.0)
    };

    let x_left = householder(
        lambda,
        t_star,
        revolutions,
        left_seed.clamp(-1.0 + 1e-9, x_min - 1e-12),
        (-1.0 + 1e-12, x_min),
        Monotonicity::Decreasing,
    )?;
    let x_right = householder(
        lambda,
        t_star,
        revolutions,
        right_seed.clamp(x_min + 1e-12, 1.0 - 1e-9),
        (x_min, 1.0 - 1e-12),
        Monotonicity::Increasing,
    )?;
    Ok((x_left, x_right))
}

/// Locate the time minimum of a multi-revolution class with Halley steps on
/// dT/dx = 0.
fn class_minimum(lambda: f64, revolutions: u32) -> Result<(f64, f64), LambertError> {
    let mut x = 0.0;
    let mut t = time_of_flight(x, lambda, revolutions);
    for _ in 0..MAX_ITERATIONS {
        let (dt, d2t, d3t) = time_derivatives(x, lambda, t);
        if dt.abs() < 1e-13 {
            return Ok((x, t));
        }
        let step = 2.0 * dt * d2t / (2.0 * d2t * d2t - dt * d3t);
        let next = (x - step).clamp(-1.0 + 1e-9, 1.0 - 1e-9);
        if (next - x).abs() < 1e-13 {
            return Ok((next, time_of_flight(next, lambda, revolutions)));
        }
        x = next;
        t = time_of_flight(x, lambda, revolutions);
    }
    Err(LambertError::ConvergenceFailure)
}

#[derive(Clone, Copy, PartialEq)]
enum Monotonicity {
    Increasing,
    Decreasing,
}

/// Third-order Householder iteration on T(x) − T*, with the bracket as a
/// safety net: any step that leaves it, or goes non-finite, is replaced by a
/// bisection step.
fn householder(
    lambda: f64,
    t_star: f64,
    revolutions: u32,
    x0: f64,
    bracket: (f64, f64),
    direction: Monotonicity,
) -> Result<f64, LambertError> {
    let (mut lo, mut hi) = bracket;
    let mut x = x0;

    for _ in 0..MAX_ITERATIONS {
        let t = time_of_flight(x, lambda, revolutions);
        let residual = t - t_star;
        if residual.abs() < TIME_TOLERANCE {
            // One Newton polish; the raw tolerance leaves km-scale position
            // error on outer-planet legs.
            let (dt, _, _) = time_derivatives(x, lambda, t);
            let polished = x - residual / dt;
            if polished.is_finite() && polished > lo && polished < hi {
                return Ok(polished);
            }
            return Ok(x);
        }

        // Shrink the bracket around the root.
        let root_is_right = match direction {
            Monotonicity::Decreasing => residual > 0.0,
            Monotonicity::Increasing => residual < 0.0,
        };
        if root_is_right {
            lo = x;
        } else {
            hi = x;
        }

        let (dt, d2t, d3t) = time_derivatives(x, lambda, t);
        let numerator = residual * (dt * dt - residual * d2t / 2.0);
        let denominator = dt * (dt * dt - residual * d2t) + d3t * residual * residual / 6.0;
        let mut next = x - numerator / denominator;
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }
        x = next;
    }

    Err(LambertError::ConvergenceFailure)
}
