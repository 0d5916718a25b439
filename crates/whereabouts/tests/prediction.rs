//! End-to-end behaviour of the store, training, and prediction.

use std::io::Write;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use whereabouts::{
    BoundingBox, EngineConfig, GeoPoint, InferenceEngine, Place, PredictionBasis, Sighting,
    SightingStore, TrainPolicy, ZoneSpec,
};

// ─────────────────────── helpers ───────────────────────

const BEDSIDE: GeoPoint = GeoPoint {
    lat: 37.7749,
    lon: -122.4194,
};
const DESK: GeoPoint = GeoPoint {
    lat: 37.7755,
    lon: -122.4185,
};

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn sighting(label: &str, ts: NaiveDateTime, track_id: i64, location: GeoPoint) -> Sighting {
    Sighting::new(label, ts, track_id, BoundingBox::default(), location)
}

fn config(dir: &tempfile::TempDir) -> EngineConfig {
    EngineConfig {
        storage_dir: dir.path().to_path_buf(),
        freshness_seconds: 600,
        cluster_radius_m: 5.0,
        zones: vec![
            ZoneSpec {
                name: "bedside".to_string(),
                lat: BEDSIDE.lat,
                lon: BEDSIDE.lon,
                radius_m: 5.0,
            },
            ZoneSpec {
                name: "desk".to_string(),
                lat: DESK.lat,
                lon: DESK.lon,
                radius_m: 5.0,
            },
        ],
    }
}

/// Engine holding the laptop scenario: bedside twice at 2 AM, desk once at 9 AM.
fn laptop_engine(dir: &tempfile::TempDir) -> InferenceEngine {
    let engine = InferenceEngine::open(&config(dir)).unwrap();
    engine.store_sighting(sighting("laptop", at(6, 2, 15), 1, BEDSIDE)).unwrap();
    engine.store_sighting(sighting("laptop", at(6, 2, 45), 2, BEDSIDE)).unwrap();
    engine.store_sighting(sighting("laptop", at(6, 9, 30), 3, DESK)).unwrap();
    engine
}

// ─────────────────────── scenario ───────────────────────

#[test]
fn test_laptop_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);
    engine.train_time_model("laptop").unwrap();

    // Next day, so the last sighting is well outside the freshness window.
    let night = engine
        .predict_location("laptop", Some(at(7, 2, 30)), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert_eq!(night.location, BEDSIDE);
    assert!(matches!(
        night.basis,
        PredictionBasis::HourlyModel { hour: 2, ref zone, probability } if zone == "bedside" && probability == 1.0
    ));

    let morning = engine
        .predict_location("laptop", Some(at(7, 9, 45)), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert_eq!(morning.location, DESK);

    let noon = engine
        .predict_location("laptop", Some(at(7, 12, 0)), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert_eq!(noon.location, DESK);
    assert!(matches!(noon.basis, PredictionBasis::LastSeenFallback { hour: 12, .. }));
}

#[test]
fn test_fresh_sighting_overrides_model() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);
    engine.train_time_model("laptop").unwrap();

    let couch = GeoPoint::new(37.7800, -122.4100);
    engine.store_sighting(sighting("laptop", at(7, 2, 20), 4, couch)).unwrap();

    let p = engine
        .predict_location("laptop", Some(at(7, 2, 25)), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert_eq!(p.location, couch);
    assert_eq!(p.basis, PredictionBasis::RecentSighting { age_seconds: 300 });
}

#[test]
fn test_freshness_boundary_is_inclusive() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);

    let edge = at(6, 9, 40);
    let p = engine
        .predict_location("laptop", Some(edge), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert_eq!(p.basis, PredictionBasis::RecentSighting { age_seconds: 600 });

    let past = edge + chrono::Duration::seconds(1);
    let p = engine
        .predict_location("laptop", Some(past), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert!(matches!(p.basis, PredictionBasis::HourlyModel { hour: 9, .. }));
}

#[test]
fn test_explanations_follow_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);
    engine.ensure_trained("laptop").unwrap();

    let recent = engine
        .explain_prediction("laptop", Some(at(6, 9, 35)), TrainPolicy::CachedOnly)
        .unwrap();
    assert_eq!(
        recent,
        "Your laptop was seen 300 seconds ago at location (37.7755, -122.4185). Returning that location."
    );

    let model = engine
        .explain_prediction("laptop", Some(at(7, 2, 30)), TrainPolicy::CachedOnly)
        .unwrap();
    assert_eq!(
        model,
        "No recent sightings. Between hour 2 and 3, your laptop was in 'bedside' 100.0% of the time (centroid at (37.7749, -122.4194))."
    );

    let noon = engine
        .explain_prediction("laptop", Some(at(7, 12, 0)), TrainPolicy::CachedOnly)
        .unwrap();
    assert!(noon.starts_with("No data for hour 12. Unable to infer laptop location"));
    assert!(noon.contains("(37.7755, -122.4185)"));
}

#[test]
fn test_mixed_hour_probability_formatting() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&config(&dir)).unwrap();
    for (i, loc) in [DESK, DESK, BEDSIDE].into_iter().enumerate() {
        engine
            .store_sighting(sighting("mug", at(6, 8, i as u32 * 10), i as i64, loc))
            .unwrap();
    }

    let text = engine
        .explain_prediction("mug", Some(at(8, 8, 0)), TrainPolicy::TrainIfMissing)
        .unwrap();
    assert!(text.contains("'desk' 66.7% of the time"), "{text}");
}

// ─────────────────────── lazy training and staleness ───────────────────────

#[test]
fn test_cached_only_does_not_train() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);

    let p = engine
        .predict_location("laptop", Some(at(7, 2, 30)), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert!(engine.model("laptop").is_none());
    assert_eq!(p.location, DESK);
    assert!(matches!(p.basis, PredictionBasis::LastSeenFallback { .. }));

    let p = engine
        .predict_location("laptop", Some(at(7, 2, 30)), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert!(engine.model("laptop").is_some());
    assert_eq!(p.location, BEDSIDE);
}

#[test]
fn test_model_is_stale_until_retrained() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);
    engine.train_time_model("laptop").unwrap();

    for minute in [0, 10, 20] {
        engine
            .store_sighting(sighting("laptop", at(6, 12, minute), 9, DESK))
            .unwrap();
    }

    let query = Some(at(8, 12, 30));
    let stale = engine
        .predict_location("laptop", query, TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert!(matches!(stale.basis, PredictionBasis::LastSeenFallback { .. }));

    engine.train_time_model("laptop").unwrap();
    let fresh = engine
        .predict_location("laptop", query, TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert!(matches!(fresh.basis, PredictionBasis::HourlyModel { hour: 12, .. }));
}

#[test]
fn test_sub_second_overshoot_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&EngineConfig {
        freshness_seconds: 300,
        ..config(&dir)
    })
    .unwrap();
    let seen = at(6, 10, 0);
    engine.store_sighting(sighting("laptop", seen, 1, DESK)).unwrap();

    let edge = engine
        .predict_location("laptop", Some(seen + chrono::Duration::seconds(300)), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert_eq!(edge.basis, PredictionBasis::RecentSighting { age_seconds: 300 });

    let over = seen + chrono::Duration::milliseconds(300_500);
    let p = engine
        .predict_location("laptop", Some(over), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert!(!matches!(p.basis, PredictionBasis::RecentSighting { .. }));
    assert!(matches!(p.basis, PredictionBasis::HourlyModel { hour: 10, ref zone, .. } if zone == "desk"));
}

#[test]
fn test_unknown_zone_winning_hour_uses_fallback_centroid() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&EngineConfig {
        cluster_radius_m: 3.0,
        ..EngineConfig::with_storage_dir(dir.path())
    })
    .unwrap();

    // Chain 2 m apart along the equator, 0..=8 m. One cluster with its centroid
    // at 4 m, so the doubled ends (4 m out) resolve to no zone and win hour 10.
    let step = 2.0 / 111_195.0;
    let point = |i: i64| GeoPoint::new(0.0, 30.0 + i as f64 * step);
    let mut minute = 0;
    for (i, repeats) in [(0, 2), (1, 1), (2, 1), (3, 1), (4, 2)] {
        for _ in 0..repeats {
            engine
                .store_sighting(sighting("tag", at(6, 10, minute), i, point(i)))
                .unwrap();
            minute += 1;
        }
    }

    let model = engine.train_time_model("tag").unwrap();
    assert_eq!(model.distribution(10).most_likely(), Some(("unknown", 4.0 / 7.0)));
    let centroid = model.centroid("cluster_0").unwrap();
    assert!((centroid.lon - point(2).lon).abs() < 1e-9);

    let next_morning = at(7, 10, 30);
    let p = engine
        .predict_location("tag", Some(next_morning), TrainPolicy::CachedOnly)
        .unwrap()
        .unwrap();
    assert_eq!(p.location, centroid);
    assert_eq!(
        p.basis,
        PredictionBasis::CentroidFallback {
            hour: 10,
            zone: "cluster_0".to_string(),
            missing_zone: Some("unknown".to_string()),
        }
    );

    let text = engine
        .explain_prediction("tag", Some(next_morning), TrainPolicy::CachedOnly)
        .unwrap();
    assert!(text.contains("'unknown', but that zone has no known centroid"));
    assert!(text.contains("falling back to zone 'cluster_0'"));
}

#[test]
fn test_unzoned_history_uses_clusters() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&EngineConfig::with_storage_dir(dir.path())).unwrap();
    let shelf = GeoPoint::new(48.8566, 2.3522);
    engine.store_sighting(sighting("keys", at(6, 18, 0), 1, shelf)).unwrap();
    engine.store_sighting(sighting("keys", at(6, 18, 5), 1, shelf)).unwrap();

    let p = engine
        .predict_location("keys", Some(at(9, 18, 30)), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert_eq!(p.location, shelf);
    assert!(matches!(p.basis, PredictionBasis::HourlyModel { ref zone, .. } if zone == "cluster_0"));
}

#[test]
fn test_clusters_are_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&EngineConfig::with_storage_dir(dir.path())).unwrap();
    engine
        .store_sighting(sighting("keys", at(6, 18, 0), 1, GeoPoint::new(1.0, 1.0)))
        .unwrap();
    engine.train_time_model("keys").unwrap();

    let empty = engine.train_time_model("phone").unwrap();
    assert_eq!(empty.centroids().count(), 0);
    assert!(empty.covered_hours().is_empty());
}

// ─────────────────────── degraded inputs ───────────────────────

#[test]
fn test_unknown_label_without_zones_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&EngineConfig::with_storage_dir(dir.path())).unwrap();
    let p = engine
        .predict_location("ghost", Some(at(6, 1, 0)), TrainPolicy::TrainIfMissing)
        .unwrap();
    assert!(p.is_none());

    let text = engine
        .explain_prediction("ghost", Some(at(6, 1, 0)), TrainPolicy::TrainIfMissing)
        .unwrap();
    assert!(text.contains("Unable to infer"));
}

#[test]
fn test_unknown_label_falls_back_to_first_zone() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&config(&dir)).unwrap();
    let p = engine
        .predict_location("ghost", Some(at(6, 1, 0)), TrainPolicy::TrainIfMissing)
        .unwrap()
        .unwrap();
    assert_eq!(p.location, BEDSIDE);
    assert_eq!(
        p.basis,
        PredictionBasis::CentroidFallback {
            hour: 1,
            zone: "bedside".to_string(),
            missing_zone: None,
        }
    );
}

#[test]
fn test_invalid_label_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&config(&dir)).unwrap();
    assert!(engine
        .predict_location("../escape", None, TrainPolicy::TrainIfMissing)
        .is_err());
    assert!(engine.get_history("", None, None).is_err());
}

#[test]
fn test_define_zone_rejects_negative_radius() {
    let dir = tempfile::tempdir().unwrap();
    let engine = InferenceEngine::open(&config(&dir)).unwrap();
    let bad = Place {
        name: "hall".to_string(),
        center: GeoPoint::new(1.0, 1.0),
        radius_m: -1.0,
    };
    assert!(engine.define_zone(bad).is_err());
    assert_eq!(engine.zones().len(), 2);
}

// ─────────────────────── persistence ───────────────────────

#[test]
fn test_history_window() {
    let dir = tempfile::tempdir().unwrap();
    let engine = laptop_engine(&dir);
    let window = engine
        .get_history("laptop", Some(at(6, 2, 45)), Some(at(6, 9, 30)))
        .unwrap();
    let ids: Vec<_> = window.iter().map(|s| s.track_id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(engine.last_seen("laptop").unwrap().unwrap().track_id, 3);
    assert!(engine.last_seen("nothing").unwrap().is_none());
}

#[test]
fn test_reload_roundtrip_skips_only_corrupt_rows() {
    let dir = tempfile::tempdir().unwrap();
    let written: Vec<Sighting> = (0..20)
        .map(|i| {
            let loc = GeoPoint::new(37.0 + i as f64 * 1e-4, -122.0 - i as f64 * 1e-4);
            sighting("phone", at(6, i % 24, i), i as i64, loc)
        })
        .collect();
    {
        let store = SightingStore::open(dir.path()).unwrap();
        for s in &written {
            store.store(s.clone()).unwrap();
        }
    }

    let path = dir.path().join("phone.txt");
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "not,a,row").unwrap();
    writeln!(file, "2025-05-06T01:00:00,1,2,3,4,5,abc,1.0").unwrap();
    drop(file);

    let reloaded = SightingStore::open(dir.path()).unwrap();
    assert_eq!(reloaded.get_sightings(Some("phone"), None), written);
    assert_eq!(reloaded.load_stats().skipped, 2);
}

#[test]
fn test_concurrent_producers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SightingStore::open(dir.path()).unwrap());

    std::thread::scope(|scope| {
        for feed in 0..4i64 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for i in 0..25u32 {
                    let s = sighting("cup", at(6, 3, 0) + chrono::Duration::seconds(i as i64), feed, BEDSIDE);
                    store.store(s).unwrap();
                    let _ = store.get_last_seen("cup");
                }
            });
        }
    });

    assert_eq!(store.count("cup"), 100);
    let reloaded = SightingStore::open(dir.path()).unwrap();
    assert_eq!(reloaded.load_stats().skipped, 0);
    assert_eq!(reloaded.get_sightings(Some("cup"), None), store.get_sightings(Some("cup"), None));
}
