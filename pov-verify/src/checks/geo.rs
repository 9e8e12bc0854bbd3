//! Geo Proximity Checker
//!
//! Great-circle distance between the submitted and reference coordinates,
//! plus a proximity score that decays linearly from 100 at the reference
//! point to 0 at twice the verification radius.

use crate::types::{Coordinate, GeoCheckResult};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Proximity score (0-100)
///
/// With a zero radius only an exact match scores.
pub fn proximity_score(distance: f64, max_distance: f64) -> f64 {
    if max_distance <= 0.0 {
        return if distance == 0.0 { 100.0 } else { 0.0 };
    }
    if distance > max_distance * 2.0 {
        return 0.0;
    }
    (100.0 - distance / max_distance * 100.0).max(0.0)
}

/// Stateless gate over submitted vs. reference location
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoChecker;

impl GeoChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        submitted: Coordinate,
        reference: Coordinate,
        max_distance: f64,
    ) -> GeoCheckResult {
        let distance = haversine_distance(submitted, reference);

        GeoCheckResult {
            passed: distance <= max_distance,
            distance_meters: distance,
            max_distance,
            score: proximity_score(distance, max_distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_distance_zero_for_identical() {
        let p = coord(48.8584, 2.2945);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = coord(51.5007, -0.1246);
        let b = coord(-33.8568, 151.2153);
        assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
    }

    #[test]
    fn test_new_york_to_boston() {
        let nyc = coord(40.7128, -74.0060);
        let boston = coord(42.3601, -71.0589);
        let d = haversine_distance(nyc, boston);
        assert!((d - 306_000.0).abs() < 500.0, "distance was {}", d);
    }

    #[test]
    fn test_antimeridian_is_short() {
        let west = coord(0.0, 179.9999);
        let east = coord(0.0, -179.9999);
        assert!(haversine_distance(west, east) < 30.0);
    }

    #[test]
    fn test_score_endpoints() {
        assert_eq!(proximity_score(0.0, 50.0), 100.0);
        assert_eq!(proximity_score(100.0, 50.0), 0.0);
        assert_eq!(proximity_score(250.0, 50.0), 0.0);
        assert_eq!(proximity_score(25.0, 50.0), 50.0);
    }

    #[test]
    fn test_score_strictly_decreasing_within_radius() {
        let mut last = f64::INFINITY;
        for step in 0..=50 {
            let score = proximity_score(step as f64, 50.0);
            assert!(score < last, "score not decreasing at {}", step);
            last = score;
        }
    }

    #[test]
    fn test_zero_radius_requires_exact_match() {
        let checker = GeoChecker::new();
        let p = coord(10.0, 10.0);
        let exact = checker.check(p, p, 0.0);
        assert!(exact.passed);
        assert_eq!(exact.score, 100.0);

        let near = checker.check(p, coord(10.00001, 10.0), 0.0);
        assert!(!near.passed);
        assert_eq!(near.score, 0.0);
    }

    #[test]
    fn test_check_gate() {
        let checker = GeoChecker::new();
        let reference = coord(40.0, -74.0);
        // ~11 m north
        let inside = checker.check(coord(40.0001, -74.0), reference, 50.0);
        assert!(inside.passed);
        assert!(inside.score > 70.0 && inside.score < 80.0);
        assert_eq!(inside.max_distance, 50.0);

        // ~111 m north
        let outside = checker.check(coord(40.001, -74.0), reference, 50.0);
        assert!(!outside.passed);
        assert_eq!(outside.score, 0.0);
    }
}
