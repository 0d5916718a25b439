//! Core data types for sightings, places, and errors.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geo::haversine_distance;

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Great-circle distance to another point in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Pixel-space detection box. Provenance only; inference never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// One timestamped observation of a labelled object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub label: String,
    /// Local wall-clock time; no offset is stored.
    pub timestamp: NaiveDateTime,
    pub track_id: i64,
    pub bbox: BoundingBox,
    pub location: GeoPoint,
}

impl Sighting {
    pub fn new(
        label: impl Into<String>,
        timestamp: NaiveDateTime,
        track_id: i64,
        bbox: BoundingBox,
        location: GeoPoint,
    ) -> Self {
        Self {
            label: label.into(),
            timestamp,
            track_id,
            bbox,
            location,
        }
    }
}

/// Default geofence radius when none is given.
pub const DEFAULT_PLACE_RADIUS_M: f64 = 3.0;

/// A manually defined circular zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl Place {
    /// Create a place, rejecting non-finite centers and negative radii.
    pub fn new(name: impl Into<String>, center: GeoPoint, radius_m: f64) -> WhereaboutsResult<Self> {
        let place = Self {
            name: name.into(),
            center,
            radius_m,
        };
        place.validate()?;
        Ok(place)
    }

    pub fn validate(&self) -> WhereaboutsResult<()> {
        if self.name.is_empty() {
            return Err(WhereaboutsError::InvalidInput(
                "Place name must not be empty".to_string(),
            ));
        }
        if !self.center.is_finite() {
            return Err(WhereaboutsError::InvalidInput(format!(
                "Place '{}' has a non-finite center {}",
                self.name, self.center
            )));
        }
        if !self.radius_m.is_finite() || self.radius_m < 0.0 {
            return Err(WhereaboutsError::InvalidInput(format!(
                "Place '{}' has invalid radius {}",
                self.name, self.radius_m
            )));
        }
        Ok(())
    }

    /// Whether the point lies within `radius_m` of the center (boundary included).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_to(point) <= self.radius_m
    }
}

/// Errors that can occur in the whereabouts library.
#[derive(thiserror::Error, Debug)]
pub enum WhereaboutsError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type WhereaboutsResult<T> = Result<T, WhereaboutsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_contains_center() {
        let place = Place::new("desk", GeoPoint::new(37.7755, -122.4185), 0.0).unwrap();
        assert!(place.contains(&GeoPoint::new(37.7755, -122.4185)));
    }

    #[test]
    fn test_place_boundary_is_monotonic() {
        let center = GeoPoint::new(37.7749, -122.4194);
        let place = Place::new("bedside", center, 5.0).unwrap();
        // One meter of latitude is about 1 / 111_195 degrees.
        let deg_per_m = 1.0 / 111_195.0;
        let inside = GeoPoint::new(center.lat + 4.9 * deg_per_m, center.lon);
        let outside = GeoPoint::new(center.lat + 5.1 * deg_per_m, center.lon);
        assert!(place.contains(&inside));
        assert!(!place.contains(&outside));
    }

    #[test]
    fn test_place_rejects_negative_radius() {
        let result = Place::new("bad", GeoPoint::new(0.0, 0.0), -1.0);
        assert!(matches!(result, Err(WhereaboutsError::InvalidInput(_))));
    }

    #[test]
    fn test_place_rejects_nan_center() {
        let result = Place::new("bad", GeoPoint::new(f64::NAN, 0.0), 1.0);
        assert!(matches!(result, Err(WhereaboutsError::InvalidInput(_))));
    }

    #[test]
    fn test_geopoint_finite() {
        assert!(GeoPoint::new(1.0, 2.0).is_finite());
        assert!(!GeoPoint::new(f64::INFINITY, 2.0).is_finite());
    }
}
