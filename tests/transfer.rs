use orbit_engine::core::constants::AU_M;
use orbit_engine::core::time::parse_epoch;
use orbit_engine::core::vector;
use orbit_engine::ephemeris::Body;
use orbit_engine::transfer::compute_transfer;

/// The 2024 Hohmann-class Earth→Mars window.
#[test]
fn hohmann_window_earth_to_mars() {
    let t_dep = parse_epoch("2024-10-07T00:00:00Z").expect("departure");
    let t_arr = parse_epoch("2025-08-18T00:00:00Z").expect("arrival");
    let transfer = compute_transfer(Body::Earth, Body::Mars, t_dep, t_arr).expect("transfer");

    assert!((314.0..316.0).contains(&transfer.tof_days()), "tof {}", transfer.tof_days());
    assert!(
        (8.0..20.0).contains(&transfer.c3_km2_s2),
        "C3 {} km^2/s^2 outside the Hohmann-class window",
        transfer.c3_km2_s2
    );
    assert!(
        (5.0..7.0).contains(&transfer.delta_v_km_s),
        "delta-v {} km/s outside the Hohmann-class window",
        transfer.delta_v_km_s
    );
    assert_eq!(transfer.revolutions, 0);
}

/// Trajectory samples must stay between Earth's and Mars's orbits for a
/// Hohmann-class arc.
#[test]
fn hohmann_arc_stays_between_the_orbits() {
    let t_dep = parse_epoch("2024-10-07T00:00:00Z").expect("departure");
    let t_arr = parse_epoch("2025-08-18T00:00:00Z").expect("arrival");
    let transfer = compute_transfer(Body::Earth, Body::Mars, t_dep, t_arr).expect("transfer");

    assert!(transfer.trajectory.len() >= 30);
    for sample in &transfer.trajectory {
        let r_au = vector::norm(&sample.position_m) / AU_M;
        assert!(
            (0.95..1.75).contains(&r_au),
            "sample at t={} is {r_au} AU from the Sun",
            sample.t_s
        );
    }
}

/// The reported Δv is the free-flight impulsive sum of the two hyperbolic
/// excess magnitudes.
#[test]
fn delta_v_is_the_free_flight_sum() {
    let t_dep = parse_epoch("2026-11-15T00:00:00Z").expect("departure");
    let t_arr = parse_epoch("2027-09-01T00:00:00Z").expect("arrival");
    let transfer = compute_transfer(Body::Earth, Body::Mars, t_dep, t_arr).expect("transfer");

    let expected =
        (vector::norm(&transfer.vinf_dep_m_s) + vector::norm(&transfer.vinf_arr_m_s)) / 1_000.0;
    assert!((transfer.delta_v_km_s - expected).abs() < 1e-9);

    let c3 = (vector::norm(&transfer.vinf_dep_m_s) / 1_000.0).powi(2);
    assert!((transfer.c3_km2_s2 - c3).abs() < 1e-9);
}
