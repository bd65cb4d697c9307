//! Wire types for the pagebridge extension channel.
//!
//! The bridge and the browser extension exchange one JSON object per frame,
//! discriminated by a `type` field. [`InboundMessage`] covers what the
//! extension sends, [`OutboundMessage`] what the bridge sends back.

pub mod message;
pub mod types;

pub use message::{Correlation, InboundMessage, OutboundMessage};
pub use types::{BrowserInfo, TabId, TabRecord, ToolDescriptor};
