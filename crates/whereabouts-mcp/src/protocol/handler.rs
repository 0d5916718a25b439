//! Routes parsed JSON-RPC messages to the whereabouts tools.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::session::WhereaboutsSession;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Answers requests and tracks the handshake state of one client.
pub struct ProtocolHandler {
    session: Arc<WhereaboutsSession>,
    handshake: RwLock<NegotiatedCapabilities>,
}

impl ProtocolHandler {
    pub fn new(session: Arc<WhereaboutsSession>) -> Self {
        Self {
            session,
            handshake: RwLock::new(NegotiatedCapabilities::default()),
        }
    }

    pub fn session(&self) -> &Arc<WhereaboutsSession> {
        &self.session
    }

    /// Whether the client has sent `initialized`.
    pub fn is_initialized(&self) -> bool {
        self.handshake
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .initialized
    }

    /// Reply to a request; notifications and stray responses yield `None`.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => {
                let id = req.id.clone();
                let outcome = match validate_request(&req) {
                    Ok(()) => self.dispatch(&req).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = &outcome {
                    tracing::debug!("Request {id} ({}) failed: {e}", req.method);
                }
                Some(reply(id, outcome))
            }
            JsonRpcMessage::Notification(notif) => {
                self.notify(notif);
                None
            }
            JsonRpcMessage::Reply(stray) => {
                tracing::warn!("Ignoring client reply to unknown request {}", stray.id);
                None
            }
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = required_params(&request.params, "initialize")?;
                let result = self
                    .handshake
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .negotiate(params)?;
                to_value(&result)
            }
            "tools/list" => to_value(&ToolListResult {
                tools: ToolRegistry::list_tools(),
                next_cursor: None,
            }),
            "tools/call" => {
                let call: ToolCallParams = required_params(&request.params, "tools/call")?;
                let result = ToolRegistry::call(&call.name, call.arguments, &self.session).await?;
                to_value(&result)
            }
            "ping" => Ok(empty_object()),
            "shutdown" => {
                // Sightings hit disk on arrival, so there is nothing to flush.
                tracing::info!(
                    "Shutdown requested by {} after {} tool calls",
                    self.client_name(),
                    self.session.tool_calls()
                );
                Ok(empty_object())
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn notify(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                let mut handshake = self.handshake.write().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = handshake.mark_initialized() {
                    tracing::error!("Failed to mark initialized: {e}");
                }
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                // Tool calls run to completion; a cancel is only logged.
                match notification
                    .params
                    .map(serde_json::from_value::<CancelRequestParams>)
                {
                    Some(Ok(p)) => tracing::info!(
                        "Client cancelled request {} ({})",
                        p.request_id,
                        p.reason.as_deref().unwrap_or("no reason")
                    ),
                    _ => tracing::info!("Received cancellation notification"),
                }
            }
            other => tracing::debug!("Unknown notification: {other}"),
        }
    }

    fn client_name(&self) -> String {
        self.handshake
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .client_name()
            .unwrap_or("unknown client")
            .to_string()
    }
}

fn reply(id: RequestId, outcome: McpResult<Value>) -> Value {
    let message = match outcome {
        Ok(result) => serde_json::to_value(JsonRpcResponse::new(id, result)),
        Err(e) => serde_json::to_value(e.to_json_rpc_error(id)),
    };
    message.unwrap_or_default()
}

fn required_params<T: DeserializeOwned>(params: &Option<Value>, method: &str) -> McpResult<T> {
    let params = params
        .clone()
        .ok_or_else(|| McpError::InvalidParams(format!("{method} requires params")))?;
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
