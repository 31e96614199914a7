//! Great-circle distance for the ride proximity filter
//!
//! The listing query computes the same haversine formula in SQL; this
//! module is the Rust mirror used for response annotation and tests.

/// Fixed radius for the ride proximity filter, in meters.
pub const PROXIMITY_RADIUS_METERS: f64 = 2_000.0;

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance between two coordinates, in meters.
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_meters(12.97, 77.59, 12.97, 77.59), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // MG Road metro to Cubbon Park metro, Bengaluru: roughly 1.1 km.
        let d = haversine_meters(12.9757, 77.6066, 12.9810, 77.5969);
        assert!((900.0..1_300.0).contains(&d), "got {} m", d);
    }

    #[test]
    fn test_long_distance() {
        // Bengaluru to Mumbai: roughly 840 km.
        let d = haversine_meters(12.9716, 77.5946, 19.0760, 72.8777);
        assert!((800_000.0..900_000.0).contains(&d), "got {} m", d);
    }

    #[test]
    fn test_symmetry() {
        let a = haversine_meters(12.9716, 77.5946, 13.0827, 80.2707);
        let b = haversine_meters(13.0827, 80.2707, 12.9716, 77.5946);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_radius_classification() {
        // A point ~1.1 km away falls inside the 2 km radius.
        let near = haversine_meters(12.9757, 77.6066, 12.9810, 77.5969);
        assert!(near <= PROXIMITY_RADIUS_METERS);

        // A point ~5 km away falls outside.
        let far = haversine_meters(12.9757, 77.6066, 13.0200, 77.6100);
        assert!(far > PROXIMITY_RADIUS_METERS);
    }
}
