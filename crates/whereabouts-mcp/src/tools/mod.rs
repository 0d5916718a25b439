//! MCP tool implementations.

pub mod explain_prediction;
pub mod frame_annotate;
pub mod get_history;
pub mod last_seen;
pub mod train_model;
pub mod predict_location;
pub mod registry;
pub mod sighting_store;
pub mod zone_define;

pub use registry::ToolRegistry;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::types::{McpError, McpResult};

/// Parse a tool timestamp. Naive ISO-8601 is taken as local time; strings
/// with an offset are converted to local time.
pub(crate) fn parse_time(s: &str) -> McpResult<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }
    whereabouts::parse_timestamp(s).map_err(|e| McpError::InvalidParams(e.to_string()))
}

pub(crate) fn parse_opt_time(s: Option<&str>) -> McpResult<Option<NaiveDateTime>> {
    s.map(parse_time).transpose()
}
