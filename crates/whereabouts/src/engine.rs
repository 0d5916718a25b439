//! Location prediction over the sighting store.
//!
//! The engine owns the geofences and one cached [`TemporalModel`] per label.
//! Models are only rebuilt by [`InferenceEngine::train_time_model`] (or lazily
//! under [`TrainPolicy::TrainIfMissing`]); new sightings do not invalidate them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::store::{validate_label, SightingStore};
use crate::temporal::TemporalModel;
use crate::types::{GeoPoint, Place, Sighting, WhereaboutsResult};
use crate::zones::ZoneModel;

/// What to do when a prediction needs a model that has not been trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainPolicy {
    /// Train and cache the model on the spot.
    #[default]
    TrainIfMissing,
    /// Treat a missing model as empty.
    CachedOnly,
}

/// Why a prediction landed where it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionBasis {
    /// The last sighting is within the freshness window.
    RecentSighting { age_seconds: i64 },
    /// The most likely zone for the hour.
    HourlyModel {
        hour: u32,
        zone: String,
        probability: f64,
    },
    /// No model data for the hour; the stale last sighting is reused.
    LastSeenFallback { hour: u32, age_seconds: i64 },
    /// A stand-in zone centroid. `missing_zone` is set when the hour's most
    /// likely zone had no centroid; otherwise the hour had no data.
    CentroidFallback {
        hour: u32,
        zone: String,
        missing_zone: Option<String>,
    },
}

/// A point estimate for a label at a given time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub at: NaiveDateTime,
    pub location: GeoPoint,
    pub basis: PredictionBasis,
}

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub label: String,
    pub observations: usize,
    pub zones: Vec<String>,
    pub covered_hours: Vec<u32>,
}

/// Prediction engine; construct once and share it with callers.
#[derive(Debug)]
pub struct InferenceEngine {
    store: Arc<SightingStore>,
    zones: RwLock<ZoneModel>,
    models: RwLock<HashMap<String, Arc<TemporalModel>>>,
    freshness_seconds: i64,
}

impl InferenceEngine {
    /// Build an engine over an existing store.
    pub fn new(store: Arc<SightingStore>, config: &EngineConfig) -> WhereaboutsResult<Self> {
        config.validate()?;
        let places = config
            .zones
            .iter()
            .map(|z| z.to_place())
            .collect::<WhereaboutsResult<Vec<_>>>()?;

        tracing::info!(
            "Inference engine ready: {} zones, freshness {}s, cluster radius {}m",
            places.len(),
            config.freshness_seconds,
            config.cluster_radius_m
        );

        Ok(Self {
            store,
            zones: RwLock::new(ZoneModel::new(places, config.cluster_radius_m)),
            models: RwLock::new(HashMap::new()),
            freshness_seconds: config.freshness_seconds,
        })
    }

    /// Open the store named by the config and build an engine over it.
    pub fn open(config: &EngineConfig) -> WhereaboutsResult<Self> {
        let store = SightingStore::open(&config.storage_dir)?;
        Self::new(Arc::new(store), config)
    }

    pub fn store(&self) -> &Arc<SightingStore> {
        &self.store
    }

    pub fn freshness_seconds(&self) -> i64 {
        self.freshness_seconds
    }

    /// Capture entry point: persist one sighting.
    pub fn store_sighting(&self, sighting: Sighting) -> WhereaboutsResult<()> {
        self.store.store(sighting)
    }

    /// Add a geofence. Cached models keep their old zone set until retrained.
    pub fn define_zone(&self, place: Place) -> WhereaboutsResult<()> {
        place.validate()?;
        tracing::info!("Defined zone '{}' at {} r={}m", place.name, place.center, place.radius_m);
        self.zones
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .define_zone(place);
        Ok(())
    }

    /// Geofences in definition order.
    pub fn zones(&self) -> Vec<Place> {
        self.zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .places()
            .to_vec()
    }

    /// Sightings of `label` within the inclusive `[since, until]` window.
    pub fn get_history(
        &self,
        label: &str,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> WhereaboutsResult<Vec<Sighting>> {
        validate_label(label)?;
        Ok(self.store.get_sightings_between(Some(label), since, until))
    }

    pub fn last_seen(&self, label: &str) -> WhereaboutsResult<Option<Sighting>> {
        validate_label(label)?;
        Ok(self.store.get_last_seen(label))
    }

    /// Rebuild the clusters and hourly model for `label` from its full history
    /// and swap it into the cache.
    pub fn train_time_model(&self, label: &str) -> WhereaboutsResult<Arc<TemporalModel>> {
        validate_label(label)?;
        let history = self.store.get_sightings(Some(label), None);

        // Fresh copy of the geofences so clusters never leak between labels.
        let mut zones = {
            let template = self.zones.read().unwrap_or_else(PoisonError::into_inner);
            ZoneModel::new(template.places().to_vec(), template.cluster_radius_m())
        };
        let model = Arc::new(TemporalModel::train(&history, &mut zones));

        tracing::info!(
            "Trained model for '{}': {} sightings, {} clusters, {} hours covered",
            label,
            history.len(),
            zones.clusters().len(),
            model.covered_hours().len()
        );

        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), Arc::clone(&model));
        Ok(model)
    }

    /// Cached model for `label`, training it first if absent.
    pub fn ensure_trained(&self, label: &str) -> WhereaboutsResult<Arc<TemporalModel>> {
        match self.model(label) {
            Some(model) => Ok(model),
            None => self.train_time_model(label),
        }
    }

    /// Cached model for `label`, if one has been trained.
    pub fn model(&self, label: &str) -> Option<Arc<TemporalModel>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .cloned()
    }

    /// Train and describe the result.
    pub fn train_summary(&self, label: &str) -> WhereaboutsResult<TrainingSummary> {
        let model = self.train_time_model(label)?;
        Ok(TrainingSummary {
            label: label.to_string(),
            observations: model.observations(),
            zones: model.centroids().map(|(name, _)| name.to_string()).collect(),
            covered_hours: model.covered_hours(),
        })
    }

    /// Best estimate of where `label` is at `at` (default: now, local time).
    ///
    /// Returns `None` only when the label has never been seen and no zone
    /// centroid is known.
    pub fn predict_location(
        &self,
        label: &str,
        at: Option<NaiveDateTime>,
        policy: TrainPolicy,
    ) -> WhereaboutsResult<Option<Prediction>> {
        validate_label(label)?;
        let at = at.unwrap_or_else(now_local);
        let last = self.store.get_last_seen(label);

        if let Some(last) = &last {
            let age = at - last.timestamp;
            // Full-precision compare: 300.5 s is stale under a 300 s window.
            let window = Duration::try_seconds(self.freshness_seconds).unwrap_or(Duration::MAX);
            if age <= window {
                return Ok(Some(Prediction {
                    label: label.to_string(),
                    at,
                    location: last.location,
                    basis: PredictionBasis::RecentSighting {
                        age_seconds: age.num_seconds(),
                    },
                }));
            }
        }

        let model = match policy {
            TrainPolicy::TrainIfMissing => self.ensure_trained(label)?,
            TrainPolicy::CachedOnly => self.model(label).unwrap_or_default(),
        };
        let hour = at.hour();
        let prediction = |location, basis| {
            Some(Prediction {
                label: label.to_string(),
                at,
                location,
                basis,
            })
        };

        let Some((zone, probability)) = model.distribution(hour).most_likely() else {
            if let Some(last) = &last {
                return Ok(prediction(
                    last.location,
                    PredictionBasis::LastSeenFallback {
                        hour,
                        age_seconds: (at - last.timestamp).num_seconds(),
                    },
                ));
            }
            return Ok(model.fallback_centroid().and_then(|(name, c)| {
                prediction(
                    c,
                    PredictionBasis::CentroidFallback {
                        hour,
                        zone: name.to_string(),
                        missing_zone: None,
                    },
                )
            }));
        };

        if let Some(centroid) = model.centroid(zone) {
            return Ok(prediction(
                centroid,
                PredictionBasis::HourlyModel {
                    hour,
                    zone: zone.to_string(),
                    probability,
                },
            ));
        }

        tracing::warn!("Zone '{zone}' of '{label}' has no centroid; using fallback");
        if let Some((name, c)) = model.fallback_centroid() {
            return Ok(prediction(
                c,
                PredictionBasis::CentroidFallback {
                    hour,
                    zone: name.to_string(),
                    missing_zone: Some(zone.to_string()),
                },
            ));
        }
        Ok(last.and_then(|last| {
            prediction(
                last.location,
                PredictionBasis::LastSeenFallback {
                    hour,
                    age_seconds: (at - last.timestamp).num_seconds(),
                },
            )
        }))
    }

    /// Human-readable rationale for [`predict_location`](Self::predict_location)
    /// with the same inputs.
    pub fn explain_prediction(
        &self,
        label: &str,
        at: Option<NaiveDateTime>,
        policy: TrainPolicy,
    ) -> WhereaboutsResult<String> {
        let prediction = self.predict_location(label, at, policy)?;
        Ok(match &prediction {
            Some(p) => explain(p),
            None => format!("No sightings or zones recorded for {label}. Unable to infer its location."),
        })
    }
}

/// Render the rationale of a prediction.
pub fn explain(prediction: &Prediction) -> String {
    let label = &prediction.label;
    let location = prediction.location;
    match &prediction.basis {
        PredictionBasis::RecentSighting { age_seconds } => format!(
            "Your {label} was seen {age_seconds} seconds ago at location {location}. Returning that location."
        ),
        PredictionBasis::HourlyModel {
            hour,
            zone,
            probability,
        } => format!(
            "No recent sightings. Between hour {hour} and {}, your {label} was in '{zone}' {:.1}% of the time (centroid at {location}).",
            hour + 1,
            probability * 100.0
        ),
        PredictionBasis::LastSeenFallback { hour, age_seconds } => format!(
            "No data for hour {hour}. Unable to infer {label} location; returning where it was last seen {age_seconds} seconds ago, {location}."
        ),
        PredictionBasis::CentroidFallback {
            hour,
            zone,
            missing_zone: None,
        } => format!(
            "No data for hour {hour}. Unable to infer {label} location; falling back to zone '{zone}' at {location}."
        ),
        PredictionBasis::CentroidFallback {
            hour,
            zone,
            missing_zone: Some(missing),
        } => format!(
            "Between hour {hour} and {}, your {label} was most often in '{missing}', but that zone has no known centroid; falling back to zone '{zone}' at {location}.",
            hour + 1
        ),
    }
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

