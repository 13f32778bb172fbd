//! # Geographic Utilities
//!
//! Geodetic computations used by the sequence pipeline.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance`] | Planar distance between two points in degrees |
//! | [`greatest_distance`] | Largest planar distance from a point to a set of points |
//! | [`haversine_distance`] | Great-circle distance between two points in meters |
//! | [`polyline_length`] | Total great-circle length of a sequence in meters |
//! | [`bearing`] | Initial compass bearing from one point towards another |
//! | [`centroid`] | Arithmetic mean position of a set of points |
//! | [`centroid_altitude`] | Mean of the altitudes present in a set of points |
//! | [`linear_increment`] | Per-step offset for evenly spacing points between two ends |
//!
//! ## Example
//!
//! ```rust
//! use photo_sequencer::{GeoPoint, geo_utils};
//!
//! let track = vec![
//!     GeoPoint::new(0.0, 0.0),
//!     GeoPoint::new(0.0, 10.0),
//!     GeoPoint::new(0.0, 20.0),
//! ];
//!
//! let heading = geo_utils::bearing(&track[0], &track[1]);
//! assert!((heading - 90.0).abs() < 1e-9); // due east
//!
//! let center = geo_utils::centroid(&track);
//! assert!((center.longitude - 10.0).abs() < 1e-9);
//! ```
//!
//! ## Coordinate System
//!
//! All functions take signed decimal degrees (WGS84 as written by GPS receivers).
//! [`distance`], [`centroid`] and [`linear_increment`] work in that flat
//! degree space and do not handle sequences that cross the antimeridian
//! (180°/-180° longitude): averaging points on both sides of it yields a
//! point near 0° longitude.

use geo::{Distance, Haversine, Point};

use crate::error::{Result, SequenceError};
use crate::GeoPoint;

// =============================================================================
// Distance Functions
// =============================================================================

/// Planar distance between two points, in degrees.
///
/// This is the Euclidean norm of the latitude and longitude differences, a
/// flat-earth approximation. Use [`haversine_distance`] for meters on the
/// surface.
#[inline]
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    (a.latitude - b.latitude).hypot(a.longitude - b.longitude)
}

/// Largest planar [`distance`] from `point` to any of `points`. Empty input gives 0.
pub fn greatest_distance(point: &GeoPoint, points: &[GeoPoint]) -> f64 {
    points
        .iter()
        .map(|p| distance(point, p))
        .fold(0.0, f64::max)
}

/// Great-circle distance between two points using the Haversine formula, in meters.
///
/// # Example
///
/// ```rust
/// use photo_sequencer::{GeoPoint, geo_utils};
///
/// let london = GeoPoint::new(51.5074, -0.1278);
/// let paris = GeoPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total great-circle length of a sequence of points in meters.
///
/// Empty or single-point sequences return 0.0.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Direction
// =============================================================================

/// Initial bearing from `from` towards `to`, in degrees clockwise from true north.
///
/// Uses the spherical atan2 formula; the result lies in `[0, 360)`. The bearing
/// of a point towards itself is `0.0`.
///
/// Reference: <http://www.movable-type.co.uk/scripts/latlong.html>
///
/// # Example
///
/// ```rust
/// use photo_sequencer::{GeoPoint, geo_utils};
///
/// let origin = GeoPoint::new(0.0, 0.0);
/// let north = GeoPoint::new(1.0, 0.0);
/// let west = GeoPoint::new(0.0, -1.0);
///
/// assert!(geo_utils::bearing(&origin, &north).abs() < 1e-9);
/// assert!((geo_utils::bearing(&origin, &west) - 270.0).abs() < 1e-9);
/// ```
pub fn bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Wrap an angle in degrees into `[0, 360)`.
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Compute the centroid of a set of points.
///
/// Returns the arithmetic mean of all latitude and longitude values, without
/// altitude. Returns (0, 0) for empty input.
///
/// # Notes
///
/// Sets of points on both sides of the antimeridian (180°/-180° longitude)
/// average to a point near 0° longitude.
///
/// # Example
///
/// ```rust
/// use photo_sequencer::{GeoPoint, geo_utils};
///
/// let points = vec![
///     GeoPoint::new(51.50, -0.10),
///     GeoPoint::new(51.52, -0.12),
/// ];
///
/// let center = geo_utils::centroid(&points);
/// assert!((center.latitude - 51.51).abs() < 0.001);
/// assert!((center.longitude - (-0.11)).abs() < 0.001);
/// ```
pub fn centroid(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::zero();
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GeoPoint::new(sum_lat / n, sum_lng / n)
}

/// Mean of the altitudes present in `points`, or `None` if no point has one.
pub fn centroid_altitude(points: &[GeoPoint]) -> Option<f64> {
    mean(points.iter().filter_map(|p| p.altitude))
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

// =============================================================================
// Interpolation
// =============================================================================

/// Offset in degrees between consecutive evenly spaced points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Increment {
    pub latitude: f64,
    pub longitude: f64,
}

impl Increment {
    /// Point reached from `start` after `steps` increments.
    pub fn apply(&self, start: &GeoPoint, steps: usize) -> GeoPoint {
        let steps = steps as f64;
        GeoPoint::new(
            start.latitude + self.latitude * steps,
            start.longitude + self.longitude * steps,
        )
    }
}

/// Per-step offset that spaces `steps` points evenly from `start` to `end`.
///
/// Computes `(end - start) / (steps - 1)` for each axis. The offset does not
/// account for distance on the surface. Fails with
/// [`SequenceError::MathDomain`] when `steps <= 1`.
///
/// # Example
///
/// ```rust
/// use photo_sequencer::{GeoPoint, geo_utils};
///
/// let start = GeoPoint::new(0.0, 0.0);
/// let end = GeoPoint::new(2.0, 20.0);
///
/// let inc = geo_utils::linear_increment(&start, &end, 3).unwrap();
/// assert_eq!(inc.apply(&start, 1), GeoPoint::new(1.0, 10.0));
/// assert!(geo_utils::linear_increment(&start, &end, 1).is_err());
/// ```
pub fn linear_increment(start: &GeoPoint, end: &GeoPoint, steps: usize) -> Result<Increment> {
    if steps <= 1 {
        return Err(SequenceError::math_domain(
            "linear interpolation",
            format!("needs at least 2 points, got {}", steps),
        ));
    }

    let divisor = (steps - 1) as f64;
    Ok(Increment {
        latitude: (end.latitude - start.latitude) / divisor,
        longitude: (end.longitude - start.longitude) / divisor,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_is_planar() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(3.0, 4.0);
        assert!(approx_eq(distance(&a, &b), 5.0, 1e-12));
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_greatest_distance() {
        let origin = GeoPoint::new(0.0, 0.0);
        let points = vec![GeoPoint::new(0.0, 1.0), GeoPoint::new(3.0, 4.0), GeoPoint::new(-1.0, 0.0)];
        assert!(approx_eq(greatest_distance(&origin, &points), 5.0, 1e-12));
        assert_eq!(greatest_distance(&origin, &[]), 0.0);
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_polyline_length_short_inputs() {
        assert_eq!(polyline_length(&[]), 0.0);
        assert_eq!(polyline_length(&[GeoPoint::new(51.5074, -0.1278)]), 0.0);
    }

    #[test]
    fn test_polyline_length_along_equator() {
        // One degree of longitude on the equator is ~111.2 km
        let track = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0), GeoPoint::new(0.0, 2.0)];
        assert!(approx_eq(polyline_length(&track), 222_390.0, 500.0));
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!(approx_eq(bearing(&origin, &GeoPoint::new(1.0, 0.0)), 0.0, 1e-9));
        assert!(approx_eq(bearing(&origin, &GeoPoint::new(0.0, 1.0)), 90.0, 1e-9));
        assert!(approx_eq(bearing(&origin, &GeoPoint::new(-1.0, 0.0)), 180.0, 1e-9));
        assert!(approx_eq(bearing(&origin, &GeoPoint::new(0.0, -1.0)), 270.0, 1e-9));
    }

    #[test]
    fn test_bearing_same_point_is_zero() {
        let p = GeoPoint::new(47.3769, 8.5417);
        assert_eq!(bearing(&p, &p), 0.0);
    }

    #[test]
    fn test_bearing_is_initial_great_circle_heading() {
        // Heading from Zurich towards New York starts out north of west
        let zurich = GeoPoint::new(47.3769, 8.5417);
        let new_york = GeoPoint::new(40.7128, -74.0060);
        let b = bearing(&zurich, &new_york);
        assert!(b > 270.0 && b < 300.0, "unexpected bearing {}", b);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!(approx_eq(normalize_degrees(-90.0), 270.0, 1e-12));
        assert!(approx_eq(normalize_degrees(450.0), 90.0, 1e-12));
        assert!(normalize_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_centroid() {
        let points = vec![GeoPoint::new(51.50, -0.10), GeoPoint::new(51.52, -0.12)];
        let center = centroid(&points);
        assert!(approx_eq(center.latitude, 51.51, 0.001));
        assert!(approx_eq(center.longitude, -0.11, 0.001));
        assert_eq!(center.altitude, None);
    }

    #[test]
    fn test_centroid_empty() {
        let center = centroid(&[]);
        assert_eq!(center.latitude, 0.0);
        assert_eq!(center.longitude, 0.0);
    }

    #[test]
    fn test_centroid_across_antimeridian_lands_near_zero() {
        // Known limitation: no wraparound handling
        let points = vec![GeoPoint::new(10.0, 179.0), GeoPoint::new(10.0, -179.0)];
        let center = centroid(&points);
        assert!(approx_eq(center.longitude, 0.0, 1e-9));
    }

    #[test]
    fn test_centroid_altitude_skips_missing() {
        let points = vec![
            GeoPoint::new(0.0, 0.0).with_altitude(10.0),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.0).with_altitude(20.0),
        ];
        assert_eq!(centroid_altitude(&points), Some(15.0));
        assert_eq!(centroid_altitude(&[GeoPoint::zero()]), None);
    }

    #[test]
    fn test_linear_increment() {
        let start = GeoPoint::new(10.0, -20.0);
        let end = GeoPoint::new(14.0, -12.0);
        let inc = linear_increment(&start, &end, 5).unwrap();
        assert!(approx_eq(inc.latitude, 1.0, 1e-12));
        assert!(approx_eq(inc.longitude, 2.0, 1e-12));
        let last = inc.apply(&start, 4);
        assert!(approx_eq(last.latitude, 14.0, 1e-12));
        assert!(approx_eq(last.longitude, -12.0, 1e-12));
    }

    #[test]
    fn test_linear_increment_rejects_single_step() {
        let p = GeoPoint::zero();
        assert!(matches!(
            linear_increment(&p, &p, 1),
            Err(SequenceError::MathDomain { .. })
        ));
        assert!(linear_increment(&p, &p, 0).is_err());
    }
}
