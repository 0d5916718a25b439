//! Whereabouts MCP server — object sightings and location prediction over
//! JSON-RPC.

pub mod config;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{build_engine_config, resolve_storage_dir, Overrides};
pub use protocol::ProtocolHandler;
pub use session::WhereaboutsSession;
pub use transport::StdioTransport;
