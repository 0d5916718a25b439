//! Error types and JSON-RPC error codes for the MCP server.

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined error codes.
pub mod mcp_error_codes {
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const STORAGE_ERROR: i32 = -32850;
    pub const INVALID_INPUT: i32 = -32851;
}

/// Errors surfaced to clients as JSON-RPC error responses.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::Storage(_) => STORAGE_ERROR,
            McpError::InvalidInput(_) => INVALID_INPUT,
            McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }
}

impl From<whereabouts::WhereaboutsError> for McpError {
    fn from(e: whereabouts::WhereaboutsError) -> Self {
        use whereabouts::WhereaboutsError as W;
        match e {
            W::InvalidInput(msg) | W::Config(msg) => McpError::InvalidInput(msg),
            W::Parse(msg) => McpError::InvalidParams(msg),
            W::Image(e) => McpError::InvalidInput(e.to_string()),
            W::Storage(msg) => McpError::Storage(msg),
            W::Io(e) => McpError::Storage(e.to_string()),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use whereabouts::WhereaboutsError;

    #[test]
    fn test_library_errors_map_to_codes() {
        let invalid: McpError = WhereaboutsError::InvalidInput("bad label".into()).into();
        assert_eq!(invalid.code(), mcp_error_codes::INVALID_INPUT);

        let storage: McpError = WhereaboutsError::Storage("disk full".into()).into();
        assert_eq!(storage.code(), mcp_error_codes::STORAGE_ERROR);
        assert_eq!(storage.to_string(), "Storage error: disk full");

        let io: McpError = WhereaboutsError::Io(std::io::Error::other("denied")).into();
        assert_eq!(io.code(), mcp_error_codes::STORAGE_ERROR);

        let parse: McpError = WhereaboutsError::Parse("bad timestamp".into()).into();
        assert_eq!(parse.code(), error_codes::INVALID_PARAMS);
    }

    #[test]
    fn test_error_response_keeps_id() {
        let err = McpError::ToolNotFound("nope".into()).to_json_rpc_error(RequestId::Number(4));
        assert_eq!(err.id, RequestId::Number(4));
        assert_eq!(err.error.code, -32803);
        assert_eq!(err.error.message, "Tool not found: nope");
    }
}
