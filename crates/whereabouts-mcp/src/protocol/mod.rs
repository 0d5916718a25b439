//! Handshake, validation, and method routing for one MCP client.
//!
//! A client must `initialize` first; after that, `tools/call` requests reach
//! the whereabouts tools through [`ProtocolHandler`].

mod handler;
mod negotiation;
mod validator;

pub use handler::ProtocolHandler;
pub use negotiation::NegotiatedCapabilities;
pub use validator::validate_request;
