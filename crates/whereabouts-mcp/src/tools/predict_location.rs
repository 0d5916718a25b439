//! Tool: predict_location — Best estimate of where an object is.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct PredictParams {
    label: String,
    #[serde(default)]
    at_time: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "predict_location".to_string(),
        description: Some(
            "Predict where an object is likely to be, from recent sightings or its hourly habits"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "The object label" },
                "at_time": { "type": "string", "format": "date-time", "description": "Time to predict for (default now)" }
            },
            "required": ["label"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: PredictParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let at = super::parse_opt_time(params.at_time.as_deref())?;
    let policy = session.train_policy();
    let prediction = session
        .blocking(move |engine| engine.predict_location(&params.label, at, policy))
        .await?;

    let Some(prediction) = prediction else {
        return Ok(ToolCallResult::json(&Value::Null));
    };

    Ok(ToolCallResult::json(&json!({
        "label": prediction.label,
        "at": prediction.at,
        "lat": prediction.location.lat,
        "lon": prediction.location.lon,
        "basis": prediction.basis,
    })))
}
