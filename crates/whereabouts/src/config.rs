//! Engine configuration and zone files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, Place, WhereaboutsError, WhereaboutsResult, DEFAULT_PLACE_RADIUS_M};
use crate::zones::DEFAULT_CLUSTER_RADIUS_M;

/// Default freshness window in seconds.
pub const DEFAULT_FRESHNESS_SECS: i64 = 300;

/// Flat zone entry as written in zone files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius")]
    pub radius_m: f64,
}

fn default_radius() -> f64 {
    DEFAULT_PLACE_RADIUS_M
}

impl ZoneSpec {
    pub fn to_place(&self) -> WhereaboutsResult<Place> {
        Place::new(self.name.clone(), GeoPoint::new(self.lat, self.lon), self.radius_m)
    }
}

impl From<&Place> for ZoneSpec {
    fn from(place: &Place) -> Self {
        Self {
            name: place.name.clone(),
            lat: place.center.lat,
            lon: place.center.lon,
            radius_m: place.radius_m,
        }
    }
}

/// Settings for [`InferenceEngine`](crate::engine::InferenceEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage_dir: PathBuf,
    pub freshness_seconds: i64,
    pub cluster_radius_m: f64,
    pub zones: Vec<ZoneSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("memory_logs"),
            freshness_seconds: DEFAULT_FRESHNESS_SECS,
            cluster_radius_m: DEFAULT_CLUSTER_RADIUS_M,
            zones: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> WhereaboutsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            WhereaboutsError::Config(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WhereaboutsResult<()> {
        if self.freshness_seconds < 0 {
            return Err(WhereaboutsError::Config(format!(
                "freshness_seconds must be non-negative, got {}",
                self.freshness_seconds
            )));
        }
        if !self.cluster_radius_m.is_finite() || self.cluster_radius_m < 0.0 {
            return Err(WhereaboutsError::Config(format!(
                "cluster_radius_m must be a non-negative number, got {}",
                self.cluster_radius_m
            )));
        }
        for zone in &self.zones {
            zone.to_place()?;
        }
        Ok(())
    }
}

/// Read a JSON array of zones.
pub fn load_zones(path: &Path) -> WhereaboutsResult<Vec<ZoneSpec>> {
    let text = std::fs::read_to_string(path)?;
    let zones: Vec<ZoneSpec> = serde_json::from_str(&text).map_err(|e| {
        WhereaboutsError::Config(format!("Invalid zone file {}: {e}", path.display()))
    })?;
    for zone in &zones {
        zone.to_place()?;
    }
    Ok(zones)
}
