//! Parameters of the requests and notifications the server understands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `tools/call` parameters. Missing `arguments` means an empty object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// `notifications/cancelled` parameters. Calls run to completion, so this is
/// only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequestParams {
    pub request_id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
