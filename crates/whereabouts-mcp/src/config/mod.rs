//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use whereabouts::{load_zones, EngineConfig, WhereaboutsResult};

/// Resolve the sighting log directory.
pub fn resolve_storage_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("WHEREABOUTS_DIR") {
        return PathBuf::from(env_path);
    }

    let cwd_dir = PathBuf::from(".whereabouts");
    if cwd_dir.is_dir() {
        return cwd_dir;
    }

    resolve_default_storage_dir()
}

fn resolve_default_storage_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(format!("{home}/.whereabouts/logs"))
}

/// Command-line overrides applied on top of an optional config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub config_file: Option<&'a Path>,
    pub dir: Option<&'a str>,
    pub zones_file: Option<&'a Path>,
    pub freshness_seconds: Option<i64>,
    pub cluster_radius_m: Option<f64>,
}

/// Build the engine config: file (if any), then flags, then directory resolution.
pub fn build_engine_config(overrides: &Overrides<'_>) -> WhereaboutsResult<EngineConfig> {
    let mut config = match overrides.config_file {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if overrides.config_file.is_none() || overrides.dir.is_some() {
        config.storage_dir = resolve_storage_dir(overrides.dir);
    }
    if let Some(path) = overrides.zones_file {
        config.zones.extend(load_zones(path)?);
    }
    if let Some(secs) = overrides.freshness_seconds {
        config.freshness_seconds = secs;
    }
    if let Some(radius) = overrides.cluster_radius_m {
        config.cluster_radius_m = radius;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        assert_eq!(resolve_storage_dir(Some("/tmp/logs")), PathBuf::from("/tmp/logs"));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"storage_dir": "from-file", "freshness_seconds": 60}"#).unwrap();
        let zones_path = dir.path().join("zones.json");
        std::fs::write(&zones_path, r#"[{"name": "desk", "lat": 1.0, "lon": 2.0}]"#).unwrap();

        let config = build_engine_config(&Overrides {
            config_file: Some(&config_path),
            zones_file: Some(&zones_path),
            cluster_radius_m: Some(10.0),
            ..Overrides::default()
        })
        .unwrap();

        assert_eq!(config.storage_dir, PathBuf::from("from-file"));
        assert_eq!(config.freshness_seconds, 60);
        assert_eq!(config.cluster_radius_m, 10.0);
        assert_eq!(config.zones.len(), 1);
    }

    #[test]
    fn test_negative_freshness_rejected() {
        let result = build_engine_config(&Overrides {
            dir: Some("/tmp/whereabouts-test"),
            freshness_seconds: Some(-5),
            ..Overrides::default()
        });
        assert!(result.is_err());
    }
}
