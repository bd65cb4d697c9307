//! Correlation tokens that carry their owning session id.
//!
//! A token is `<session id>_<kind>_<counter>`. Decoding splits from the right
//! so session ids that themselves contain `_` survive the round trip:
//! `"foo_bar_call_7"` decodes to session `"foo_bar"`, kind `"call"`, counter 7.

use std::fmt;

/// Separator between token segments.
pub const SEPARATOR: char = '_';

/// Operation kind encoded in the middle segment of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// Tool call, echoed back as `callId`.
	Call,
	/// Tool discovery, echoed back as `callId`.
	Discover,
	/// Tab open, echoed back as `requestId`.
	Open,
	/// Tab focus, echoed back as `requestId`.
	Focus,
}

impl TokenKind {
	pub fn prefix(self) -> &'static str {
		match self {
			Self::Call => "call",
			Self::Discover => "discover",
			Self::Open => "open",
			Self::Focus => "focus",
		}
	}

	fn from_prefix(prefix: &str) -> Option<Self> {
		match prefix {
			"call" => Some(Self::Call),
			"discover" => Some(Self::Discover),
			"open" => Some(Self::Open),
			"focus" => Some(Self::Focus),
			_ => None,
		}
	}
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.prefix())
	}
}

/// A decoded correlation token borrowing from its source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallToken<'a> {
	pub session_id: &'a str,
	pub kind: TokenKind,
	pub counter: u64,
}

/// Builds a token for `session_id`.
pub fn generate(session_id: &str, kind: TokenKind, counter: u64) -> String {
	format!("{session_id}{SEPARATOR}{}{SEPARATOR}{counter}", kind.prefix())
}

/// Decodes a token produced by [`generate`].
///
/// Returns `None` unless the last two segments are a known kind and a counter.
/// Everything before them is the session id, which may be empty.
pub fn decode(token: &str) -> Option<CallToken<'_>> {
	let mut parts = token.rsplitn(3, SEPARATOR);
	let counter = parts.next()?.parse().ok()?;
	let kind = TokenKind::from_prefix(parts.next()?)?;
	let session_id = parts.next()?;
	Some(CallToken {
		session_id,
		kind,
		counter,
	})
}

/// Recovers the owning session id from a token.
pub fn extract_session_id(token: &str) -> Option<&str> {
	decode(token).map(|t| t.session_id)
}
