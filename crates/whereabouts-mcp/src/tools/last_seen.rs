//! Tool: last_seen — Most recent sighting of an object.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct LastSeenParams {
    label: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "last_seen".to_string(),
        description: Some("Get the most recent sighting of an object".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "The object label" }
            },
            "required": ["label"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: LastSeenParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let last = session.engine().last_seen(&params.label)?;

    Ok(ToolCallResult::json(&json!({
        "label": params.label,
        "found": last.is_some(),
        "sighting": last,
    })))
}
