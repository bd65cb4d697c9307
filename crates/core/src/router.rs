//! Inbound message routing.
//!
//! Every frame from the extension passes through [`route`] while the bridge
//! lock is held, so the browser-state mutation a message carries is applied
//! before the continuation it resolves is woken.

use pagebridge_protocol::{Correlation, InboundMessage, OutboundMessage, TabId, TabRecord};
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::bridge::Core;
use crate::call_id;
use crate::error::{BridgeError, Result};
use crate::session::{CallReply, Session};
use crate::state::ConnectInfo;

/// Session that receives messages carrying no session affinity.
pub const DEFAULT_SESSION: &str = "default";

/// Picks the session an inbound message belongs to.
///
/// Order: explicit `sessionId`, then the session encoded in `callId`, then in
/// `requestId`, then [`DEFAULT_SESSION`].
pub fn owning_session<'a>(correlation: Correlation<'a>) -> &'a str {
	correlation
		.session_id
		.or_else(|| correlation.call_id.and_then(call_id::extract_session_id))
		.or_else(|| correlation.request_id.and_then(call_id::extract_session_id))
		.unwrap_or(DEFAULT_SESSION)
}

pub(crate) fn route(core: &mut Core, message: InboundMessage) {
	let session_id = owning_session(message.correlation()).to_string();
	trace!(target: "pagebridge.router", kind = message.kind(), session = %session_id, "inbound");

	match message {
		InboundMessage::Ping => {
			if let Err(err) = core.gateway.send(OutboundMessage::Pong) {
				debug!(target: "pagebridge.router", error = %err, "pong not sent");
			}
		}
		InboundMessage::Connected {
			session_id: explicit,
			browser,
			tabs,
		} => {
			core.state.mark_connected(browser, tabs);
			let info = core.state.connect_info();
			info!(
				target: "pagebridge.router",
				browser = %info.name,
				version = %info.version,
				tabs = info.tab_count,
				"browser connected"
			);
			if explicit.is_some() {
				if let Some(session) = core.sessions.peek_mut(&session_id) {
					resolve_connect(session, info);
				}
			} else {
				// The browser is shared, so an unattributed announcement
				// answers every session waiting on it.
				for session in core.sessions.iter_mut() {
					resolve_connect(session, info.clone());
				}
			}
		}
		InboundMessage::Disconnected { .. } => {
			core.state.mark_disconnected();
			info!(target: "pagebridge.router", "browser disconnected");
		}
		InboundMessage::TabCreated { request_id, tab, .. } => {
			core.state.upsert_tab(tab.clone());
			if let Some(request_id) = request_id {
				resolve_open(core, &session_id, &request_id, tab);
			}
		}
		InboundMessage::TabUpdated { tab_id, title, url, .. } => {
			if !core.state.update_tab(tab_id, title, url) {
				debug!(target: "pagebridge.router", tab_id, "update for unknown tab");
			}
		}
		InboundMessage::TabClosed { tab_id, .. } => {
			core.state.remove_tab(tab_id);
			resolve_close(core, &session_id, tab_id);
		}
		InboundMessage::TabFocused {
			request_id, tab_id, tools, ..
		} => {
			if let Some(tools) = tools {
				core.state.set_tools(tab_id, tools);
			}
			if let Some(request_id) = request_id {
				let tab = core
					.state
					.tab(tab_id)
					.cloned()
					.unwrap_or_else(|| TabRecord::new(tab_id, "", ""));
				resolve_open(core, &session_id, &request_id, tab);
			}
		}
		InboundMessage::ToolsChanged { tab_id, tools, .. } => {
			core.state.set_tools(tab_id, tools);
		}
		InboundMessage::ToolsDiscovered {
			call_id, tab_id, tools, ..
		} => {
			core.state.set_tools(tab_id, tools.clone());
			if let Some(call_id) = call_id {
				resolve_call(core, &session_id, &call_id, Ok(CallReply::Tools(tools)));
			}
		}
		InboundMessage::ToolResult {
			call_id, result, error, ..
		} => {
			let outcome = match error {
				Some(message) => Err(BridgeError::RemoteTool(message)),
				None => Ok(CallReply::ToolResult(result.unwrap_or(Value::Null))),
			};
			resolve_call(core, &session_id, &call_id, outcome);
		}
	}
}

fn resolve_connect(session: &mut Session, info: ConnectInfo) {
	if session.connect.complete(Ok(info)) {
		session.finish_connect();
	}
}

fn resolve_open(core: &mut Core, session_id: &str, request_id: &str, tab: TabRecord) {
	let resolved = core
		.sessions
		.peek_mut(session_id)
		.is_some_and(|session| session.opens.complete(request_id, Ok(tab)));
	if !resolved {
		debug!(target: "pagebridge.router", session = session_id, request_id, "no pending tab request");
	}
}

fn resolve_call(core: &mut Core, session_id: &str, call_id: &str, outcome: Result<CallReply>) {
	let resolved = core
		.sessions
		.peek_mut(session_id)
		.is_some_and(|session| session.calls.complete(call_id, outcome));
	if !resolved {
		debug!(target: "pagebridge.router", session = session_id, call_id, "no pending call");
	}
}

/// Resolves one waiter for a closed tab.
///
/// The owning session is tried first. Close notifications are often
/// broadcasts without affinity, so otherwise the first session with a
/// pending close on this tab wins; only one waiter is ever satisfied.
fn resolve_close(core: &mut Core, session_id: &str, tab_id: TabId) {
	if core
		.sessions
		.peek_mut(session_id)
		.is_some_and(|session| session.closes.complete(&tab_id, Ok(())))
	{
		return;
	}
	for session in core.sessions.iter_mut() {
		if session.closes.complete(&tab_id, Ok(())) {
			debug!(target: "pagebridge.router", session = session.id(), tab_id, "close resolved by search");
			return;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_owning_session_order() {
		let explicit = Correlation {
			session_id: Some("a"),
			call_id: Some("b_call_1"),
			request_id: Some("c_open_2"),
		};
		assert_eq!(owning_session(explicit), "a");

		let by_call = Correlation {
			call_id: Some("foo_bar_call_1"),
			request_id: Some("c_open_2"),
			..Correlation::default()
		};
		assert_eq!(owning_session(by_call), "foo_bar");

		let by_request = Correlation {
			request_id: Some("c_open_2"),
			..Correlation::default()
		};
		assert_eq!(owning_session(by_request), "c");

		assert_eq!(owning_session(Correlation::default()), DEFAULT_SESSION);
	}

	#[test]
	fn test_undecodable_token_falls_back_to_default() {
		let correlation = Correlation {
			call_id: Some("garbage"),
			..Correlation::default()
		};
		assert_eq!(owning_session(correlation), DEFAULT_SESSION);
	}
}
