//! Tool: train_model — Rebuild an object's hourly model from its history.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct TrainParams {
    label: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "train_model".to_string(),
        description: Some(
            "Retrain an object's zone clusters and hourly location model from all its sightings"
                .to_string(),
        ),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "The object label" }
            },
            "required": ["label"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: TrainParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let summary = session
        .blocking(move |engine| engine.train_summary(&params.label))
        .await?;
    Ok(ToolCallResult::json(&summary))
}
