//! Session-aware call correlation between automation clients and a browser
//! extension.
//!
//! Many logical clients (sessions) share one extension connection. Each
//! request a session issues is tagged with a correlation token that encodes
//! the session id, and every reply the extension sends is routed back to the
//! session that owns it. A pending operation ends exactly once: with its
//! reply, its timeout, or a teardown rejection when its session is deleted
//! or the extension disconnects.
//!
//! [`Bridge`] is the entry point. Transports attach the extension with
//! [`Bridge::attach_extension`] and feed inbound frames to
//! [`Bridge::handle_extension_text`]; clients call the async operations.

mod bridge;
pub mod call_id;
mod config;
mod error;
mod gateway;
mod pending;
pub mod router;
mod session;
mod session_table;
mod state;

pub use bridge::{Bridge, IdleSweeper};
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorKind, Result};
pub use gateway::{ExtensionGateway, LinkId};
pub use pagebridge_protocol as protocol;
pub use pagebridge_protocol::{BrowserInfo, InboundMessage, OutboundMessage, TabId, TabRecord, ToolDescriptor};
pub use pending::OpId;
pub use session::Session;
pub use session_table::{SessionSnapshot, SessionTable};
pub use state::{BrowserState, ConnectInfo};
