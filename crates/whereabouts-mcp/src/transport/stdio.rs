//! Newline-delimited JSON-RPC over stdin and stdout.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult, RequestId};

use super::framing;

pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Serve until stdin closes. Requests are answered one at a time, in order.
    pub async fn run(&self) -> McpResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut handled: u64 = 0;

        tracing::info!("Listening on stdio");
        while let Some(line) = lines.next_line().await.map_err(McpError::Io)? {
            if line.trim().is_empty() {
                continue;
            }
            handled += 1;
            if let Some(reply) = self.answer(&line).await {
                write_line(&mut stdout, &reply).await?;
            }
        }

        tracing::info!("stdin closed after {handled} messages");
        Ok(())
    }

    /// Reply for one input line. Unparseable lines get an error with a null id.
    async fn answer(&self, line: &str) -> Option<Value> {
        match framing::parse_message(line) {
            Ok(msg) => {
                tracing::debug!("<- {}", msg.method().unwrap_or("reply"));
                self.handler.handle_message(msg).await
            }
            Err(e) => {
                tracing::warn!("Unreadable message: {e}");
                serde_json::to_value(e.to_json_rpc_error(RequestId::Null)).ok()
            }
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, value: &Value) -> McpResult<()> {
    let framed = framing::frame_message(value)?;
    out.write_all(framed.as_bytes()).await.map_err(McpError::Io)?;
    out.flush().await.map_err(McpError::Io)
}
