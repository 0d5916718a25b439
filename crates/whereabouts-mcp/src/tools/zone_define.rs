//! Tool: zone_define — Add a named circular zone.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use whereabouts::{GeoPoint, Place, DEFAULT_PLACE_RADIUS_M};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct ZoneParams {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default = "default_radius")]
    radius_m: f64,
}

fn default_radius() -> f64 {
    DEFAULT_PLACE_RADIUS_M
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "zone_define".to_string(),
        description: Some(
            "Define a named zone (e.g., 'desk'). Takes effect at the next model training".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "lat": { "type": "number" },
                "lon": { "type": "number" },
                "radius_m": { "type": "number", "default": DEFAULT_PLACE_RADIUS_M, "minimum": 0 }
            },
            "required": ["name", "lat", "lon"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: ZoneParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let place = Place::new(
        params.name,
        GeoPoint::new(params.lat, params.lon),
        params.radius_m,
    )?;
    session.engine().define_zone(place.clone())?;

    let zones = session.engine().zones();
    let shadowed = zones.iter().position(|z| z.name == place.name) != Some(zones.len() - 1);

    Ok(ToolCallResult::json(&json!({
        "defined": place,
        "total_zones": zones.len(),
        "shadowed": shadowed,
    })))
}
