use orbit_engine::core::vector;
use orbit_engine::ephemeris::{Body, MU_SUN_M3_S2, propagate};

/// Sample times spanning several decades around the epoch (s).
fn sample_times() -> Vec<f64> {
    (-4..=8)
        .map(|years| f64::from(years) * 2.5 * 365.25 * 86_400.0)
        .collect()
}

#[test]
fn orbital_energy_matches_the_semi_major_axis() {
    for body in Body::PLANETS {
        let elements = body.elements().expect("planet elements");
        let expected = -MU_SUN_M3_S2 / (2.0 * elements.a_m);
        for t in sample_times() {
            let state = propagate(body, t).expect("state");
            let r = vector::norm(&state.position_m);
            let v = vector::norm(&state.velocity_m_s);
            let energy = v * v / 2.0 - MU_SUN_M3_S2 / r;
            let relative = (energy - expected).abs() / expected.abs();
            assert!(relative < 1e-6, "{body} at t={t}: energy off by {relative:e}");
        }
    }
}

#[test]
fn angular_momentum_matches_the_conic_parameter() {
    for body in Body::PLANETS {
        let elements = body.elements().expect("planet elements");
        let expected = (MU_SUN_M3_S2 * elements.a_m * (1.0 - elements.e * elements.e)).sqrt();
        for t in sample_times() {
            let state = propagate(body, t).expect("state");
            let h = vector::norm(&vector::cross(&state.position_m, &state.velocity_m_s));
            let relative = (h - expected).abs() / expected;
            assert!(relative < 1e-6, "{body} at t={t}: |r x v| off by {relative:e}");
        }
    }
}

#[test]
fn propagation_is_periodic() {
    for body in Body::PLANETS {
        let period = body.elements().expect("planet elements").period_s();
        for &t in &[0.0, 1.0e7, 4.0e8] {
            let now = propagate(body, t).expect("state");
            let later = propagate(body, t + period).expect("state one period on");
            let r_scale = vector::norm(&now.position_m);
            let dr = vector::norm(&vector::sub(&later.position_m, &now.position_m));
            let dv = vector::norm(&vector::sub(&later.velocity_m_s, &now.velocity_m_s));
            let v_scale = vector::norm(&now.velocity_m_s);
            assert!(dr / r_scale < 1e-6, "{body}: position drift {dr} m over one period");
            assert!(dv / v_scale < 1e-6, "{body}: velocity drift {dv} m/s over one period");
        }
    }
}

#[test]
fn the_sun_never_moves() {
    for t in sample_times() {
        let state = propagate(Body::Sun, t).expect("sun");
        assert_eq!(state.position_m, [0.0; 3]);
        assert_eq!(state.velocity_m_s, [0.0; 3]);
    }
}
