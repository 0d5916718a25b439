//! Durable per-label sighting log with an in-memory mirror.
//!
//! Each label owns one append-only text file `<label>.txt` inside the storage
//! directory. Every row is
//!
//! ```text
//! timestamp,track_id,x,y,w,h,lat,lon
//! ```
//!
//! with a local ISO-8601 timestamp (no offset). Rows that fail to parse are
//! skipped on load so a torn trailing write never hides the rest of the file.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;

use crate::types::{BoundingBox, GeoPoint, Sighting, WhereaboutsError, WhereaboutsResult};

/// File extension of per-label logs.
pub const LOG_EXTENSION: &str = "txt";

/// Number of comma-separated fields in a log row.
const FIELD_COUNT: usize = 8;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Counters collected while replaying the logs at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files: usize,
    pub rows: usize,
    pub skipped: usize,
}

/// Append-only sighting store. Safe to share between threads.
#[derive(Debug)]
pub struct SightingStore {
    storage_dir: PathBuf,
    cache: RwLock<BTreeMap<String, Vec<Sighting>>>,
    load_stats: LoadStats,
}

impl SightingStore {
    /// Open (or create) a storage directory and replay every log in it.
    pub fn open(storage_dir: impl Into<PathBuf>) -> WhereaboutsResult<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir).map_err(|e| {
            WhereaboutsError::Storage(format!(
                "Failed to create storage directory {}: {e}",
                storage_dir.display()
            ))
        })?;

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&storage_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == LOG_EXTENSION))
            .collect();
        paths.sort();

        let mut cache = BTreeMap::new();
        let mut stats = LoadStats::default();

        for path in paths {
            let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_label(label).is_err() {
                tracing::warn!("Ignoring log with unusable label: {}", path.display());
                continue;
            }

            let (events, skipped) = read_log(&path, label)?;
            stats.files += 1;
            stats.rows += events.len();
            stats.skipped += skipped;
            if skipped > 0 {
                tracing::warn!("Skipped {skipped} malformed rows in {}", path.display());
            }
            if !events.is_empty() {
                cache.insert(label.to_string(), events);
            }
        }

        tracing::info!(
            "Opened sighting store at {}: {} labels, {} sightings",
            storage_dir.display(),
            cache.len(),
            stats.rows
        );

        Ok(Self {
            storage_dir,
            cache: RwLock::new(cache),
            load_stats: stats,
        })
    }

    /// Directory holding the per-label logs.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Counters from the startup replay.
    pub fn load_stats(&self) -> LoadStats {
        self.load_stats
    }

    /// Append a sighting to its label's log, then to the mirror.
    ///
    /// Both happen under one write lock; if the log write fails the mirror is
    /// left untouched.
    pub fn store(&self, sighting: Sighting) -> WhereaboutsResult<()> {
        validate_label(&sighting.label)?;
        if !sighting.location.is_finite() {
            return Err(WhereaboutsError::InvalidInput(format!(
                "Sighting of '{}' has non-finite location {}",
                sighting.label, sighting.location
            )));
        }

        let row = encode_row(&sighting);
        let path = self.log_path(&sighting.label);

        let mut cache = self.write();
        append_row(&path, &row).map_err(|e| {
            WhereaboutsError::Storage(format!("Failed to append to {}: {e}", path.display()))
        })?;
        tracing::debug!("Stored sighting of '{}' at {}", sighting.label, sighting.timestamp);
        cache.entry(sighting.label.clone()).or_default().push(sighting);
        Ok(())
    }

    /// Most recently appended sighting for `label`.
    pub fn get_last_seen(&self, label: &str) -> Option<Sighting> {
        self.read().get(label).and_then(|events| events.last().cloned())
    }

    /// The sighting of `label` at `index` in append order; the latest when
    /// `index` is `None` or out of range.
    pub fn get_sighting_at(&self, label: &str, index: Option<usize>) -> Option<Sighting> {
        let cache = self.read();
        let events = cache.get(label)?;
        index
            .and_then(|i| events.get(i))
            .or_else(|| events.last())
            .cloned()
    }

    /// Sightings for one label (or every label, sorted by label) with
    /// `timestamp >= since`, in append order.
    pub fn get_sightings(&self, label: Option<&str>, since: Option<NaiveDateTime>) -> Vec<Sighting> {
        self.get_sightings_between(label, since, None)
    }

    /// Like [`get_sightings`](Self::get_sightings) with an inclusive upper bound.
    pub fn get_sightings_between(
        &self,
        label: Option<&str>,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> Vec<Sighting> {
        let cache = self.read();
        let in_range = |s: &&Sighting| {
            since.map_or(true, |t| s.timestamp >= t) && until.map_or(true, |t| s.timestamp <= t)
        };

        match label {
            Some(label) => cache
                .get(label)
                .map(|events| events.iter().filter(in_range).cloned().collect())
                .unwrap_or_default(),
            None => cache
                .values()
                .flat_map(|events| events.iter().filter(in_range).cloned())
                .collect(),
        }
    }

    /// Labels with at least one sighting, sorted.
    pub fn labels(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Number of sightings held for `label`.
    pub fn count(&self, label: &str) -> usize {
        self.read().get(label).map_or(0, Vec::len)
    }

    fn log_path(&self, label: &str) -> PathBuf {
        self.storage_dir.join(format!("{label}.{LOG_EXTENSION}"))
    }

    // Appends are all-or-nothing, so a poisoned lock still guards a
    // consistent mirror.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<Sighting>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<Sighting>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reject labels that cannot safely name a log file.
pub fn validate_label(label: &str) -> WhereaboutsResult<()> {
    if label.is_empty() {
        return Err(WhereaboutsError::InvalidInput(
            "Label must not be empty".to_string(),
        ));
    }
    if label == "."
        || label.contains("..")
        || label.contains(['/', '\\'])
        || label.chars().any(char::is_control)
    {
        return Err(WhereaboutsError::InvalidInput(format!(
            "Invalid label: {label:?}"
        )));
    }
    Ok(())
}

/// Serialize a sighting as one log row, trailing newline included.
pub fn encode_row(sighting: &Sighting) -> String {
    let b = &sighting.bbox;
    format!(
        "{},{},{},{},{},{},{},{}\n",
        sighting.timestamp.format(TIMESTAMP_FORMAT),
        sighting.track_id,
        b.x,
        b.y,
        b.w,
        b.h,
        sighting.location.lat,
        sighting.location.lon,
    )
}

/// Parse one log row for `label`.
pub fn decode_row(label: &str, line: &str) -> WhereaboutsResult<Sighting> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(WhereaboutsError::Parse(format!(
            "Expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }

    let timestamp = parse_timestamp(fields[0])?;
    let track_id = parse_field::<i64>(fields[1], "track_id")?;
    let bbox = BoundingBox {
        x: parse_field(fields[2], "x")?,
        y: parse_field(fields[3], "y")?,
        w: parse_field(fields[4], "w")?,
        h: parse_field(fields[5], "h")?,
    };
    let location = GeoPoint::new(parse_field(fields[6], "lat")?, parse_field(fields[7], "lon")?);
    if !location.is_finite() {
        return Err(WhereaboutsError::Parse(format!(
            "Non-finite location {location}"
        )));
    }

    Ok(Sighting {
        label: label.to_string(),
        timestamp,
        track_id,
        bbox,
        location,
    })
}

/// Parse a local ISO-8601 timestamp with optional fractional seconds.
pub fn parse_timestamp(s: &str) -> WhereaboutsResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| WhereaboutsError::Parse(format!("Invalid timestamp {s:?}: {e}")))
}

fn parse_field<T: std::str::FromStr>(s: &str, name: &str) -> WhereaboutsResult<T> {
    s.parse()
        .map_err(|_| WhereaboutsError::Parse(format!("Invalid {name}: {s:?}")))
}

fn read_log(path: &Path, label: &str) -> WhereaboutsResult<(Vec<Sighting>, usize)> {
    let bytes = std::fs::read(path).map_err(|e| {
        WhereaboutsError::Storage(format!("Failed to read {}: {e}", path.display()))
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let mut events = Vec::new();
    let mut skipped = 0;
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_row(label, line) {
            Ok(sighting) => events.push(sighting),
            Err(e) => {
                tracing::debug!("{}:{}: skipping row: {e}", path.display(), n + 1);
                skipped += 1;
            }
        }
    }
    Ok((events, skipped))
}

fn append_row(path: &Path, row: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

    // Terminate a torn trailing row so the new row starts on its own line.
    let mut buf = String::with_capacity(row.len() + 1);
    if file.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            buf.push('\n');
        }
    }
    buf.push_str(row);

    file.write_all(buf.as_bytes())?;
    file.flush()
}
