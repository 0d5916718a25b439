//! Tool: frame_annotate — Draw a stored sighting onto a camera frame.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine as _;
use image::ImageFormat;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct AnnotateParams {
    label: String,
    /// Base64-encoded frame in any format `image` can decode.
    image: String,
    #[serde(default)]
    event_index: Option<usize>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "frame_annotate".to_string(),
        description: Some(
            "Draw the bounding box and caption of a sighting onto a frame, returned as PNG"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "label": { "type": "string" },
                "image": { "type": "string", "description": "Base64-encoded image" },
                "event_index": { "type": "integer", "minimum": 0, "description": "Sighting index (default latest)" }
            },
            "required": ["label", "image"]
        }),
    }
}

pub async fn execute(args: Value, session: &Arc<WhereaboutsSession>) -> McpResult<ToolCallResult> {
    let params: AnnotateParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    whereabouts::store::validate_label(&params.label)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(params.image.as_bytes())
        .map_err(|e| McpError::InvalidParams(format!("Invalid base64 image: {e}")))?;
    let png = session
        .blocking(move |engine| {
            let frame = image::load_from_memory(&bytes)?;
            let annotated = whereabouts::annotate_frame(
                &frame,
                engine.store(),
                &params.label,
                params.event_index,
            );
            let mut png = Vec::new();
            annotated.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            Ok(png)
        })
        .await?;

    Ok(ToolCallResult::image(
        base64::engine::general_purpose::STANDARD.encode(&png),
        "image/png",
    ))
}
