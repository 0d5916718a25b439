//! Tool: sighting_store — Record one sighting from a capture feed.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use whereabouts::{BoundingBox, GeoPoint, Sighting};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct StoreParams {
    label: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    track_id: i64,
    #[serde(default)]
    bbox: Option<BoxParam>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct BoxParam {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "sighting_store".to_string(),
        description: Some("Record a sighting of an object at a location".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "Object label (e.g., 'my_laptop')" },
                "timestamp": { "type": "string", "format": "date-time", "description": "When it was seen (default now)" },
                "track_id": { "type": "integer", "default": 0 },
                "bbox": {
                    "type": "object",
                    "properties": {
                        "x": { "type": "integer" },
                        "y": { "type": "integer" },
                        "w": { "type": "integer" },
                        "h": { "type": "integer" }
                    },
                    "required": ["x", "y", "w", "h"]
                },
                "lat": { "type": "number" },
                "lon": { "type": "number" }
            },
            "required": ["label", "lat", "lon"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: StoreParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let timestamp = match params.timestamp.as_deref() {
        Some(ts) => super::parse_time(ts)?,
        None => chrono::Local::now().naive_local(),
    };
    let bbox = params
        .bbox
        .map(|b| BoundingBox::new(b.x, b.y, b.w, b.h))
        .unwrap_or_default();

    let sighting = Sighting::new(
        params.label,
        timestamp,
        params.track_id,
        bbox,
        GeoPoint::new(params.lat, params.lon),
    );
    let stored = sighting.clone();
    session
        .blocking(move |engine| engine.store_sighting(stored))
        .await?;

    Ok(ToolCallResult::json(&json!({
        "stored": true,
        "sighting": sighting,
    })))
}
