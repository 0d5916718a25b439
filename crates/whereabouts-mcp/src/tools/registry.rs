//! Tool registration and dispatch.

use std::sync::Arc;

use serde_json::Value;

use crate::session::WhereaboutsSession;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    explain_prediction, frame_annotate, get_history, last_seen, predict_location,
    sighting_store, train_model, zone_define,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            sighting_store::definition(),
            get_history::definition(),
            last_seen::definition(),
            predict_location::definition(),
            explain_prediction::definition(),
            zone_define::definition(),
            train_model::definition(),
            frame_annotate::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        session: &Arc<WhereaboutsSession>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));
        session.record_call();

        match name {
            "sighting_store" => sighting_store::execute(args, session).await,
            "get_history" => get_history::execute(args, session).await,
            "last_seen" => last_seen::execute(args, session).await,
            "predict_location" => predict_location::execute(args, session).await,
            "explain_prediction" => explain_prediction::execute(args, session).await,
            "zone_define" => zone_define::execute(args, session).await,
            "train_model" => train_model::execute(args, session).await,
            "frame_annotate" => frame_annotate::execute(args, session).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
