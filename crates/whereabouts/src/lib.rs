//! Whereabouts — durable object sightings, zone resolution, and time-of-day
//! location prediction.

pub mod annotate;
pub mod config;
pub mod engine;
pub mod geo;
pub mod store;
pub mod temporal;
pub mod types;
pub mod zones;

pub use annotate::{annotate_frame, annotate_sighting};
pub use config::{load_zones, EngineConfig, ZoneSpec, DEFAULT_FRESHNESS_SECS};
pub use engine::{explain, InferenceEngine, Prediction, PredictionBasis, TrainPolicy, TrainingSummary};
pub use geo::{haversine_distance, EARTH_RADIUS_M};
pub use store::{parse_timestamp, LoadStats, SightingStore};
pub use temporal::{HourDistribution, TemporalModel};
pub use types::*;
pub use zones::{AutoCluster, ZoneModel, DEFAULT_CLUSTER_RADIUS_M, UNKNOWN_ZONE};
