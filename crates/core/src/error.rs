//! Error types for the bridge core.

use pagebridge_protocol::TabId;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Coarse classification of a [`BridgeError`], stable for front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	NotConnected,
	AlreadyInProgress,
	Timeout,
	RemoteToolError,
	SessionClosed,
	ConnectionClosed,
	NotFound,
	Conflict,
	Protocol,
}

/// Errors surfaced to callers of [`Bridge`](crate::Bridge) operations.
///
/// Every pending operation ends in exactly one successful payload or one of
/// these; late replies for settled operations are dropped, not reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
	/// No browser extension is attached, or it has no live browser.
	#[error("Browser extension not connected")]
	NotConnected,

	/// The same session already has this operation outstanding.
	#[error("{operation} already in progress")]
	AlreadyInProgress { operation: String },

	/// No correlating reply arrived in time.
	#[error("{0}")]
	Timeout(String),

	/// The page reported a failure for a tool call.
	#[error("Tool error: {0}")]
	RemoteTool(String),

	/// The owning session was deleted or evicted while the call was pending.
	#[error("Session closed")]
	SessionClosed,

	/// The extension connection dropped while the call was pending.
	#[error("Extension connection closed")]
	ConnectionClosed,

	#[error("Tab not found: {0}")]
	TabNotFound(TabId),

	#[error("Session already exists: {0}")]
	SessionExists(String),

	/// A second extension tried to attach while one is live.
	#[error("Another browser extension is already connected")]
	ExtensionAlreadyAttached,

	/// Inbound frame could not be understood.
	#[error("Protocol error: {0}")]
	Protocol(String),
}

impl BridgeError {
	pub(crate) fn in_progress(operation: impl Into<String>) -> Self {
		Self::AlreadyInProgress {
			operation: operation.into(),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::NotConnected => ErrorKind::NotConnected,
			Self::AlreadyInProgress { .. } => ErrorKind::AlreadyInProgress,
			Self::Timeout(_) => ErrorKind::Timeout,
			Self::RemoteTool(_) => ErrorKind::RemoteToolError,
			Self::SessionClosed => ErrorKind::SessionClosed,
			Self::ConnectionClosed => ErrorKind::ConnectionClosed,
			Self::TabNotFound(_) => ErrorKind::NotFound,
			Self::SessionExists(_) | Self::ExtensionAlreadyAttached => ErrorKind::Conflict,
			Self::Protocol(_) => ErrorKind::Protocol,
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout(_))
	}

	/// Returns true if the operation was drained by session or connection teardown.
	pub fn is_closed(&self) -> bool {
		matches!(self, Self::SessionClosed | Self::ConnectionClosed)
	}
}

impl From<serde_json::Error> for BridgeError {
	fn from(err: serde_json::Error) -> Self {
		Self::Protocol(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timeout_message_is_verbatim() {
		let err = BridgeError::Timeout("Timeout waiting for tool result".to_string());
		assert_eq!(err.to_string(), "Timeout waiting for tool result");
		assert!(err.is_timeout());
		assert_eq!(err.kind(), ErrorKind::Timeout);
	}

	#[test]
	fn test_closed_predicates() {
		assert!(BridgeError::SessionClosed.is_closed());
		assert!(BridgeError::ConnectionClosed.is_closed());
		assert!(!BridgeError::NotConnected.is_closed());
	}

	#[test]
	fn test_not_found_is_distinct_from_not_connected() {
		assert_eq!(BridgeError::TabNotFound(4).kind(), ErrorKind::NotFound);
		assert_eq!(BridgeError::NotConnected.kind(), ErrorKind::NotConnected);
		assert_eq!(BridgeError::TabNotFound(4).to_string(), "Tab not found: 4");
	}
}
