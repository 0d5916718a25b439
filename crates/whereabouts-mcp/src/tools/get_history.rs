//! Tool: get_history — List recorded sightings of an object.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct HistoryParams {
    label: String,
    #[serde(default)]
    since: Option<String>,
    #[serde(default)]
    until: Option<String>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    100
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_history".to_string(),
        description: Some("List all recorded sightings for an object".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "The object label (e.g., 'my_laptop')" },
                "since": { "type": "string", "format": "date-time", "description": "ISO timestamp to start from (inclusive)" },
                "until": { "type": "string", "format": "date-time", "description": "ISO timestamp to end at (inclusive)" },
                "max_results": { "type": "integer", "default": 100, "description": "Most recent sightings to return" }
            },
            "required": ["label"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: HistoryParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let since = super::parse_opt_time(params.since.as_deref())?;
    let until = super::parse_opt_time(params.until.as_deref())?;
    let history = session.engine().get_history(&params.label, since, until)?;

    let total = history.len();
    let skip = total.saturating_sub(params.max_results);

    Ok(ToolCallResult::json(&json!({
        "label": params.label,
        "total": total,
        "sightings": &history[skip..],
    })))
}
