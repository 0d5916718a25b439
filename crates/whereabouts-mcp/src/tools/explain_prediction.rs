//! Tool: explain_prediction — Why an object is predicted where it is.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct ExplainParams {
    label: String,
    #[serde(default)]
    at_time: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "explain_prediction".to_string(),
        description: Some("Explain in plain language how a location prediction was made".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "The object label" },
                "at_time": { "type": "string", "format": "date-time", "description": "Time to explain (default now)" }
            },
            "required": ["label"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: ExplainParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let at = super::parse_opt_time(params.at_time.as_deref())?;
    let policy = session.train_policy();
    let label = params.label;
    let explanation = {
        let label = label.clone();
        session
            .blocking(move |engine| engine.explain_prediction(&label, at, policy))
            .await?
    };

    Ok(ToolCallResult::json(&json!({
        "label": label,
        "explanation": explanation,
    })))
}
