use crate::domain::Fix;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial compass bearing from the first point to the second, in degrees
/// normalized to `[0, 360)`.
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let x = dlon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlon.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Annotates every fix after the first with speed (km/h) and bearing from its
/// predecessor. Non-positive time deltas leave both absent; an exactly zero
/// displacement leaves bearing absent (direction undefined) with speed 0.
pub fn enrich_timeline(timeline: &mut [Fix]) {
    for i in 1..timeline.len() {
        let prev = timeline[i - 1].clone();
        let curr = &mut timeline[i];

        let elapsed_hours =
            (curr.instant - prev.instant).num_seconds() as f64 / 3600.0;
        if elapsed_hours <= 0.0 {
            continue;
        }

        let distance_km =
            haversine_km(prev.latitude, prev.longitude, curr.latitude, curr.longitude);
        curr.speed = Some(distance_km / elapsed_hours);
        if distance_km > 0.0 {
            curr.bearing = Some(initial_bearing_deg(
                prev.latitude,
                prev.longitude,
                curr.latitude,
                curr.longitude,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn fix_at(hour: u32, lat: f64, lon: f64) -> Fix {
        Fix::new(
            Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap(),
            lat,
            lon,
        )
    }

    #[test]
    fn haversine_is_symmetric() {
        let d1 = haversine_km(10.0, -50.0, 12.0, -52.0);
        let d2 = haversine_km(12.0, -52.0, 10.0, -50.0);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn haversine_zero_at_same_point() {
        assert_eq!(haversine_km(10.0, -50.0, 10.0, -50.0), 0.0);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        // One degree of latitude is roughly 111.2 km on a 6371 km sphere.
        let d = haversine_km(10.0, -50.0, 11.0, -50.0);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let north = initial_bearing_deg(10.0, -50.0, 11.0, -50.0);
        assert!(north.abs() < 1e-6, "got {north}");

        let east = initial_bearing_deg(0.0, -50.0, 0.0, -49.0);
        assert!((east - 90.0).abs() < 1e-6, "got {east}");

        let south = initial_bearing_deg(11.0, -50.0, 10.0, -50.0);
        assert!((south - 180.0).abs() < 1e-6, "got {south}");
    }

    #[test]
    fn bearing_always_in_range() {
        let points = [
            (10.0, -50.0, 9.0, -51.0),
            (45.0, 170.0, 44.0, -170.0),
            (-30.0, 20.0, -31.0, 19.0),
            (60.0, 0.0, 60.0, -1.0),
        ];
        for (lat1, lon1, lat2, lon2) in points {
            let bearing = initial_bearing_deg(lat1, lon1, lat2, lon2);
            assert!((0.0..360.0).contains(&bearing), "got {bearing}");
        }
    }

    #[test]
    fn first_fix_has_no_kinematics() {
        let mut timeline = vec![fix_at(0, 10.0, -50.0), fix_at(6, 11.0, -51.0)];
        enrich_timeline(&mut timeline);
        assert_eq!(timeline[0].speed, None);
        assert_eq!(timeline[0].bearing, None);
        assert!(timeline[1].speed.is_some());
        assert!(timeline[1].bearing.is_some());
    }

    #[test]
    fn speed_and_bearing_jointly_present_when_moving() {
        let mut timeline = vec![
            fix_at(0, 10.0, -50.0),
            fix_at(6, 11.0, -51.0),
            fix_at(12, 12.0, -52.5),
        ];
        enrich_timeline(&mut timeline);
        for fix in &timeline[1..] {
            assert_eq!(fix.speed.is_some(), fix.bearing.is_some());
        }
    }

    #[test]
    fn zero_elapsed_leaves_both_absent() {
        let mut timeline = vec![fix_at(6, 10.0, -50.0), fix_at(6, 11.0, -51.0)];
        enrich_timeline(&mut timeline);
        assert_eq!(timeline[1].speed, None);
        assert_eq!(timeline[1].bearing, None);
    }

    #[test]
    fn stationary_storm_has_zero_speed_and_no_bearing() {
        let mut timeline = vec![fix_at(0, 10.0, -50.0), fix_at(1, 10.0, -50.0)];
        enrich_timeline(&mut timeline);
        assert_eq!(timeline[1].speed, Some(0.0));
        assert_eq!(timeline[1].bearing, None);
    }

    #[test]
    fn speed_matches_distance_over_time() {
        let mut timeline = vec![fix_at(0, 10.0, -50.0), fix_at(6, 11.0, -50.0)];
        enrich_timeline(&mut timeline);
        let expected = haversine_km(10.0, -50.0, 11.0, -50.0) / 6.0;
        let speed = timeline[1].speed.unwrap();
        assert!((speed - expected).abs() < 1e-9);
    }
}
