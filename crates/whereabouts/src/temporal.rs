//! Per-label zone occupancy conditioned on hour of day.

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::types::{GeoPoint, Sighting};
use crate::zones::ZoneModel;

pub const HOURS_PER_DAY: usize = 24;

/// Probability of each zone within one hour bucket, in the order the zones
/// were first observed in that hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourDistribution {
    entries: Vec<(String, f64)>,
}

impl HourDistribution {
    fn from_counts(counts: Vec<(String, usize)>) -> Self {
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return Self::default();
        }
        let entries = counts
            .into_iter()
            .map(|(zone, n)| (zone, n as f64 / total as f64))
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, zone: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(z, _)| z == zone)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(z, p)| (z.as_str(), *p))
    }

    /// Highest-probability zone; the first one observed wins a tie.
    pub fn most_likely(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (zone, p) in self.iter() {
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((zone, p));
            }
        }
        best
    }
}

/// Hourly zone distributions and the centroid of every known zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalModel {
    hours: Vec<HourDistribution>,
    centroids: Vec<(String, GeoPoint)>,
    observations: usize,
    trained_at: Option<NaiveDateTime>,
}

impl Default for TemporalModel {
    fn default() -> Self {
        Self {
            hours: vec![HourDistribution::default(); HOURS_PER_DAY],
            centroids: Vec::new(),
            observations: 0,
            trained_at: None,
        }
    }
}

impl TemporalModel {
    /// Fit `zones` to the history, then count zone occupancy per local hour.
    ///
    /// `zones` is refitted in place, so pass a model that holds only the
    /// geofences and no clusters from another label.
    pub fn train(history: &[Sighting], zones: &mut ZoneModel) -> Self {
        let points: Vec<GeoPoint> = history.iter().map(|s| s.location).collect();
        zones.fit(&points);

        let mut counts: Vec<Vec<(String, usize)>> = vec![Vec::new(); HOURS_PER_DAY];
        for sighting in history {
            let bucket = &mut counts[sighting.timestamp.hour() as usize];
            let zone = zones.assign(&sighting.location);
            match bucket.iter_mut().find(|(z, _)| *z == zone) {
                Some((_, n)) => *n += 1,
                None => bucket.push((zone, 1)),
            }
        }

        let hours = counts.into_iter().map(HourDistribution::from_counts).collect();

        // Geofences in definition order (first of a duplicated name wins),
        // then clusters, which replace a geofence of the same name.
        let mut centroids: Vec<(String, GeoPoint)> = Vec::new();
        for place in zones.places() {
            if !centroids.iter().any(|(name, _)| *name == place.name) {
                centroids.push((place.name.clone(), place.center));
            }
        }
        for cluster in zones.clusters() {
            let name = cluster.name();
            match centroids.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = cluster.centroid,
                None => centroids.push((name, cluster.centroid)),
            }
        }

        Self {
            hours,
            centroids,
            observations: history.len(),
            trained_at: Some(chrono::Local::now().naive_local()),
        }
    }

    /// Distribution for an hour of day (0-23). Out-of-range hours are empty.
    pub fn distribution(&self, hour: u32) -> &HourDistribution {
        static EMPTY: HourDistribution = HourDistribution {
            entries: Vec::new(),
        };
        self.hours.get(hour as usize).unwrap_or(&EMPTY)
    }

    pub fn centroid(&self, zone: &str) -> Option<GeoPoint> {
        self.centroids
            .iter()
            .find(|(name, _)| name == zone)
            .map(|(_, c)| *c)
    }

    /// Zone used when nothing better is available: the first geofence, or the
    /// first cluster when no geofences are defined.
    pub fn fallback_centroid(&self) -> Option<(&str, GeoPoint)> {
        self.centroids.first().map(|(name, c)| (name.as_str(), *c))
    }

    pub fn centroids(&self) -> impl Iterator<Item = (&str, GeoPoint)> {
        self.centroids.iter().map(|(name, c)| (name.as_str(), *c))
    }

    /// Hours with at least one observation.
    pub fn covered_hours(&self) -> Vec<u32> {
        (0..HOURS_PER_DAY as u32)
            .filter(|h| !self.hours[*h as usize].is_empty())
            .collect()
    }

    /// Number of sightings the model was trained on.
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn trained_at(&self) -> Option<NaiveDateTime> {
        self.trained_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Place};
    use crate::zones::UNKNOWN_ZONE;
    use chrono::NaiveDate;

    const BEDSIDE: GeoPoint = GeoPoint {
        lat: 37.7749,
        lon: -122.4194,
    };
    const DESK: GeoPoint = GeoPoint {
        lat: 37.7755,
        lon: -122.4185,
    };

    fn sighting(h: u32, m: u32, location: GeoPoint) -> Sighting {
        let ts = NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        Sighting::new("laptop", ts, 1, BoundingBox::default(), location)
    }

    fn zones() -> ZoneModel {
        ZoneModel::new(
            vec![
                Place::new("bedside", BEDSIDE, 5.0).unwrap(),
                Place::new("desk", DESK, 5.0).unwrap(),
            ],
            5.0,
        )
    }

    #[test]
    fn test_empty_history_gives_empty_buckets() {
        let model = TemporalModel::train(&[], &mut zones());
        assert!(model.covered_hours().is_empty());
        assert_eq!(model.observations(), 0);
        assert_eq!(model.fallback_centroid().map(|(n, _)| n), Some("bedside"));
    }

    #[test]
    fn test_hour_probabilities_sum_to_one() {
        let far = GeoPoint::new(37.8, -122.5);
        let history = vec![
            sighting(2, 15, BEDSIDE),
            sighting(2, 45, BEDSIDE),
            sighting(2, 50, DESK),
            sighting(2, 55, far),
            sighting(9, 30, DESK),
        ];
        let model = TemporalModel::train(&history, &mut zones());

        for hour in model.covered_hours() {
            let total: f64 = model.distribution(hour).iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        assert_eq!(model.covered_hours(), vec![2, 9]);
        assert_eq!(model.distribution(2).get("bedside"), Some(0.5));
        assert_eq!(model.distribution(2).get("cluster_2"), Some(0.25));
        assert!(model.distribution(12).is_empty());
        assert!(model.distribution(99).is_empty());
    }

    #[test]
    fn test_most_likely_tie_goes_to_first_observed() {
        let history = vec![sighting(7, 0, DESK), sighting(7, 30, BEDSIDE)];
        let model = TemporalModel::train(&history, &mut zones());
        assert_eq!(model.distribution(7).most_likely(), Some(("desk", 0.5)));
    }

    #[test]
    fn test_centroids_merge_places_and_clusters() {
        let far = GeoPoint::new(37.8, -122.5);
        let history = vec![sighting(1, 0, BEDSIDE), sighting(1, 5, far)];
        let mut zones = zones();
        let model = TemporalModel::train(&history, &mut zones);

        let names: Vec<_> = model.centroids().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["bedside", "desk", "cluster_0", "cluster_1"]);
        assert_eq!(model.centroid("cluster_1"), Some(far));
        assert_eq!(model.centroid("desk"), Some(DESK));
        assert!(model.centroid(UNKNOWN_ZONE).is_none());
    }

    #[test]
    fn test_duplicate_place_names_keep_first_center() {
        let mut zones = zones();
        zones.define_zone(Place::new("desk", GeoPoint::new(1.0, 1.0), 5.0).unwrap());
        let model = TemporalModel::train(&[], &mut zones);
        assert_eq!(model.centroid("desk"), Some(DESK));
    }
}
