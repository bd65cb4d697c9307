//! Messages exchanged with the browser extension.
//!
//! Every frame is one JSON object carrying a `type` discriminator. Messages
//! the extension sends on behalf of a client carry a `sessionId` and, for
//! replies, the correlation token that was issued with the request:
//!
//! - `callId` for [`OutboundMessage::CallTool`] and [`OutboundMessage::DiscoverTools`]
//! - `requestId` for [`OutboundMessage::OpenTab`] and [`OutboundMessage::FocusTab`]
//!
//! Unsolicited broadcasts (tab lifecycle events, `disconnected`) usually carry
//! neither.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BrowserInfo, TabId, TabRecord, ToolDescriptor};

/// Message sent from the browser extension to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
	/// Keepalive; answered with [`OutboundMessage::Pong`] immediately.
	Ping,
	/// The extension has a live browser behind it.
	Connected {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		#[serde(default)]
		browser: BrowserInfo,
		#[serde(default)]
		tabs: Vec<TabRecord>,
	},
	/// The browser behind the extension went away.
	Disconnected {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
	},
	TabCreated {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		/// Present when the tab was opened by an `openTab` request.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		request_id: Option<String>,
		tab: TabRecord,
	},
	TabUpdated {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		tab_id: TabId,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		title: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		url: Option<String>,
	},
	TabClosed {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		tab_id: TabId,
	},
	TabFocused {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		/// Present when the focus was requested by a `focusTab` request.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		request_id: Option<String>,
		tab_id: TabId,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		tools: Option<Vec<ToolDescriptor>>,
	},
	/// The page changed its exposed tools without being asked.
	ToolsChanged {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		tab_id: TabId,
		#[serde(default)]
		tools: Vec<ToolDescriptor>,
	},
	/// Reply to [`OutboundMessage::DiscoverTools`], or a page announcement.
	ToolsDiscovered {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		call_id: Option<String>,
		tab_id: TabId,
		#[serde(default)]
		tools: Vec<ToolDescriptor>,
	},
	/// Reply to [`OutboundMessage::CallTool`].
	ToolResult {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		session_id: Option<String>,
		call_id: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		result: Option<Value>,
		/// Set when the page reported a failure instead of a result.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
}

/// Correlation fields carried by an inbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Correlation<'a> {
	pub session_id: Option<&'a str>,
	pub call_id: Option<&'a str>,
	pub request_id: Option<&'a str>,
}

impl InboundMessage {
	/// Parses one text frame.
	pub fn from_json(raw: &str) -> serde_json::Result<Self> {
		serde_json::from_str(raw)
	}

	/// Wire name of this message kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Ping => "ping",
			Self::Connected { .. } => "connected",
			Self::Disconnected { .. } => "disconnected",
			Self::TabCreated { .. } => "tabCreated",
			Self::TabUpdated { .. } => "tabUpdated",
			Self::TabClosed { .. } => "tabClosed",
			Self::TabFocused { .. } => "tabFocused",
			Self::ToolsChanged { .. } => "toolsChanged",
			Self::ToolsDiscovered { .. } => "toolsDiscovered",
			Self::ToolResult { .. } => "toolResult",
		}
	}

	pub fn correlation(&self) -> Correlation<'_> {
		match self {
			Self::Ping => Correlation::default(),
			Self::Connected { session_id, .. }
			| Self::Disconnected { session_id }
			| Self::TabUpdated { session_id, .. }
			| Self::TabClosed { session_id, .. }
			| Self::ToolsChanged { session_id, .. } => Correlation {
				session_id: session_id.as_deref(),
				..Correlation::default()
			},
			Self::TabCreated {
				session_id,
				request_id,
				..
			}
			| Self::TabFocused {
				session_id,
				request_id,
				..
			} => Correlation {
				session_id: session_id.as_deref(),
				call_id: None,
				request_id: request_id.as_deref(),
			},
			Self::ToolsDiscovered {
				session_id, call_id, ..
			} => Correlation {
				session_id: session_id.as_deref(),
				call_id: call_id.as_deref(),
				request_id: None,
			},
			Self::ToolResult {
				session_id, call_id, ..
			} => Correlation {
				session_id: session_id.as_deref(),
				call_id: Some(call_id.as_str()),
				request_id: None,
			},
		}
	}
}

/// Message sent from the bridge to the browser extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
	/// Answer to [`InboundMessage::Ping`].
	Pong,
	/// Ask the extension to report its browser; answered by `connected`.
	Connect { session_id: String },
	/// Answered by `tabCreated` echoing `requestId`.
	OpenTab {
		session_id: String,
		request_id: String,
		url: String,
	},
	/// Answered by `tabFocused` echoing `requestId`.
	FocusTab {
		session_id: String,
		request_id: String,
		tab_id: TabId,
	},
	/// Answered by `tabClosed`.
	CloseTab { session_id: String, tab_id: TabId },
	/// Answered by `toolResult` echoing `callId`.
	CallTool {
		session_id: String,
		call_id: String,
		tab_id: TabId,
		tool_name: String,
		args: Value,
	},
	/// Answered by `toolsDiscovered` echoing `callId`.
	DiscoverTools {
		session_id: String,
		call_id: String,
		tab_id: TabId,
	},
}

impl OutboundMessage {
	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Pong => "pong",
			Self::Connect { .. } => "connect",
			Self::OpenTab { .. } => "openTab",
			Self::FocusTab { .. } => "focusTab",
			Self::CloseTab { .. } => "closeTab",
			Self::CallTool { .. } => "callTool",
			Self::DiscoverTools { .. } => "discoverTools",
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_deserialize_connected() {
		let raw = r#"{
			"type": "connected",
			"sessionId": "s1",
			"browser": {"name": "Chrome", "version": "120.0"},
			"tabs": [{"id": 1, "title": "t", "url": "http://x", "tools": []}]
		}"#;
		let message = InboundMessage::from_json(raw).unwrap();

		match message {
			InboundMessage::Connected {
				session_id,
				browser,
				tabs,
			} => {
				assert_eq!(session_id.as_deref(), Some("s1"));
				assert_eq!(browser.name, "Chrome");
				assert_eq!(browser.version, "120.0");
				assert_eq!(tabs.len(), 1);
				assert_eq!(tabs[0].id, 1);
				assert_eq!(tabs[0].url, "http://x");
			}
			other => panic!("Expected Connected, got {other:?}"),
		}
	}

	#[test]
	fn test_deserialize_ping_ignores_extra_fields() {
		let message = InboundMessage::from_json(r#"{"type":"ping","sessionId":"x","ts":1}"#).unwrap();
		assert_eq!(message, InboundMessage::Ping);
		assert_eq!(message.correlation(), Correlation::default());
	}

	#[test]
	fn test_deserialize_tool_result_with_error() {
		let raw = r#"{"type":"toolResult","callId":"s1_call_3","error":"boom"}"#;
		let message = InboundMessage::from_json(raw).unwrap();

		let correlation = message.correlation();
		assert_eq!(correlation.session_id, None);
		assert_eq!(correlation.call_id, Some("s1_call_3"));
		match message {
			InboundMessage::ToolResult { result, error, .. } => {
				assert!(result.is_none());
				assert_eq!(error.as_deref(), Some("boom"));
			}
			other => panic!("Expected ToolResult, got {other:?}"),
		}
	}

	#[test]
	fn test_tool_descriptor_defaults_schema() {
		let raw = r#"{"type":"toolsChanged","tabId":4,"tools":[{"name":"search"}]}"#;
		let message = InboundMessage::from_json(raw).unwrap();

		match message {
			InboundMessage::ToolsChanged { tab_id, tools, .. } => {
				assert_eq!(tab_id, 4);
				assert_eq!(tools[0].name, "search");
				assert_eq!(tools[0].description, "");
				assert_eq!(tools[0].input_schema["type"], "object");
			}
			other => panic!("Expected ToolsChanged, got {other:?}"),
		}
	}

	#[test]
	fn test_tab_created_request_id_correlation() {
		let raw = r#"{"type":"tabCreated","requestId":"s1_open_1","tab":{"id":7,"url":"http://example.com"}}"#;
		let message = InboundMessage::from_json(raw).unwrap();

		assert_eq!(message.kind(), "tabCreated");
		assert_eq!(message.correlation().request_id, Some("s1_open_1"));
	}

	#[test]
	fn test_unknown_type_is_rejected() {
		assert!(InboundMessage::from_json(r#"{"type":"reload"}"#).is_err());
	}

	#[test]
	fn test_serialize_call_tool() {
		let message = OutboundMessage::CallTool {
			session_id: "s1".to_string(),
			call_id: "s1_call_1".to_string(),
			tab_id: 3,
			tool_name: "search".to_string(),
			args: json!({"q": "rust"}),
		};
		let value: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();

		assert_eq!(
			value,
			json!({
				"type": "callTool",
				"sessionId": "s1",
				"callId": "s1_call_1",
				"tabId": 3,
				"toolName": "search",
				"args": {"q": "rust"}
			})
		);
	}

	#[test]
	fn test_serialize_pong() {
		assert_eq!(OutboundMessage::Pong.to_json().unwrap(), r#"{"type":"pong"}"#);
	}
}
