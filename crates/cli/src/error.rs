use pagebridge::{BridgeError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error information for failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
	pub code: ErrorCode,
	/// Human-readable; never contains correlation tokens.
	pub message: String,
}

impl CommandError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}

	pub fn invalid_input(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidInput, message)
	}
}

impl From<BridgeError> for CommandError {
	fn from(err: BridgeError) -> Self {
		Self::new(ErrorCode::from(err.kind()), err.to_string())
	}
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// No extension, or no browser behind it
	NotConnected,
	/// The session already has this operation outstanding
	AlreadyInProgress,
	Timeout,
	/// The page reported a tool failure
	ToolError,
	SessionClosed,
	ConnectionClosed,
	/// Unknown tab
	NotFound,
	InvalidInput,
	InternalError,
}

impl From<ErrorKind> for ErrorCode {
	fn from(kind: ErrorKind) -> Self {
		match kind {
			ErrorKind::NotConnected => Self::NotConnected,
			ErrorKind::AlreadyInProgress => Self::AlreadyInProgress,
			ErrorKind::Timeout => Self::Timeout,
			ErrorKind::RemoteToolError => Self::ToolError,
			ErrorKind::SessionClosed => Self::SessionClosed,
			ErrorKind::ConnectionClosed => Self::ConnectionClosed,
			ErrorKind::NotFound => Self::NotFound,
			ErrorKind::Conflict | ErrorKind::Protocol => Self::InternalError,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::NotConnected => write!(f, "NOT_CONNECTED"),
			ErrorCode::AlreadyInProgress => write!(f, "ALREADY_IN_PROGRESS"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::ToolError => write!(f, "TOOL_ERROR"),
			ErrorCode::SessionClosed => write!(f, "SESSION_CLOSED"),
			ErrorCode::ConnectionClosed => write!(f, "CONNECTION_CLOSED"),
			ErrorCode::NotFound => write!(f, "NOT_FOUND"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}
