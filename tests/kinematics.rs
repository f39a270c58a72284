use chrono::{TimeZone, Utc};

use stormlink::domain::Fix;
use stormlink::kinematics::{enrich_timeline, haversine_km, initial_bearing_deg};

fn fix(day: u32, hour: u32, lat: f64, lon: f64) -> Fix {
    Fix::new(
        Utc.with_ymd_and_hms(2024, 7, day, hour, 0, 0).unwrap(),
        lat,
        lon,
    )
}

#[test]
fn distance_is_symmetric_over_many_pairs() {
    let pairs = [
        (10.0, -50.0, 12.5, -53.0),
        (0.0, 0.0, 0.0, 180.0),
        (-40.0, 170.0, -35.0, -175.0),
        (89.0, 10.0, 88.0, -170.0),
    ];
    for (lat1, lon1, lat2, lon2) in pairs {
        let forward = haversine_km(lat1, lon1, lat2, lon2);
        let backward = haversine_km(lat2, lon2, lat1, lon1);
        assert!((forward - backward).abs() < 1e-9);
    }
}

#[test]
fn distance_to_self_is_zero() {
    assert_eq!(haversine_km(23.4, -71.2, 23.4, -71.2), 0.0);
}

#[test]
fn bearing_stays_in_range_for_all_octants() {
    for dlat in [-2.0, 0.0, 2.0] {
        for dlon in [-2.0, 0.0, 2.0] {
            if dlat == 0.0 && dlon == 0.0 {
                continue;
            }
            let bearing = initial_bearing_deg(20.0, -60.0, 20.0 + dlat, -60.0 + dlon);
            assert!((0.0..360.0).contains(&bearing), "got {bearing}");
        }
    }
}

#[test]
fn speed_and_bearing_jointly_present_for_moving_fixes() {
    let mut timeline = vec![
        fix(1, 0, 10.0, -50.0),
        fix(1, 6, 10.8, -51.2),
        fix(1, 12, 11.5, -52.6),
        fix(1, 18, 12.1, -54.0),
    ];
    enrich_timeline(&mut timeline);
    assert_eq!(timeline[0].speed, None);
    assert_eq!(timeline[0].bearing, None);
    for fix in &timeline[1..] {
        assert!(fix.speed.is_some());
        assert!(fix.bearing.is_some());
    }
}

#[test]
fn non_positive_elapsed_leaves_both_absent() {
    let mut timeline = vec![fix(1, 6, 10.0, -50.0), fix(1, 6, 10.5, -50.5)];
    enrich_timeline(&mut timeline);
    assert_eq!(timeline[1].speed, None);
    assert_eq!(timeline[1].bearing, None);
}

#[test]
fn stationary_fix_has_zero_speed_and_absent_bearing() {
    let mut timeline = vec![fix(1, 6, 10.0, -50.0), fix(1, 7, 10.0, -50.0)];
    enrich_timeline(&mut timeline);
    assert_eq!(timeline[1].speed, Some(0.0));
    assert_eq!(timeline[1].bearing, None);
}

#[test]
fn northward_track_bears_zero() {
    let mut timeline = vec![fix(1, 0, 10.0, -50.0), fix(1, 6, 12.0, -50.0)];
    enrich_timeline(&mut timeline);
    let bearing = timeline[1].bearing.unwrap();
    assert!(bearing.abs() < 1e-6 || (360.0 - bearing) < 1e-6);
}

#[test]
fn six_hour_fix_spacing_yields_plausible_storm_speeds() {
    // A storm crossing ~1.3 degrees in 6 hours moves around 25 km/h.
    let mut timeline = vec![fix(1, 0, 14.0, -60.0), fix(1, 6, 14.5, -61.3)];
    enrich_timeline(&mut timeline);
    let speed = timeline[1].speed.unwrap();
    assert!(speed > 15.0 && speed < 40.0, "got {speed}");
}
