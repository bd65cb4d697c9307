//! The bridge context: session table, browser state and extension gateway
//! behind one lock.
//!
//! Every client operation checks its preconditions, registers its pending
//! entry and queues the outbound request within a single lock acquisition,
//! so a reply can never race ahead of its registration. The lock is never
//! held across an `.await`.

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use pagebridge_protocol::{InboundMessage, OutboundMessage, TabId, TabRecord, ToolDescriptor};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::call_id::TokenKind;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::gateway::{ExtensionGateway, LinkId};
use crate::pending::{Pending, PendingMap, Reply};
use crate::router;
use crate::session::{CallReply, Session};
use crate::session_table::{SessionSnapshot, SessionTable};
use crate::state::{BrowserState, ConnectInfo};

const CONNECT_TIMEOUT: &str = "Timeout waiting for browser connection";
const OPEN_TAB_TIMEOUT: &str = "Timeout waiting for tab to open";
const FOCUS_TAB_TIMEOUT: &str = "Timeout waiting for tab focus";
const CLOSE_TAB_TIMEOUT: &str = "Timeout waiting for tab to close";
const TOOL_CALL_TIMEOUT: &str = "Timeout waiting for tool result";
const DISCOVER_TIMEOUT: &str = "Timeout waiting for tool discovery";

/// State shared by every session, guarded by the bridge lock.
#[derive(Debug, Default)]
pub(crate) struct Core {
	pub(crate) sessions: SessionTable,
	pub(crate) state: BrowserState,
	pub(crate) gateway: ExtensionGateway,
}

impl Core {
	fn ensure_browser(&self) -> Result<()> {
		self.gateway.ensure_attached()?;
		if !self.state.is_connected() {
			return Err(BridgeError::NotConnected);
		}
		Ok(())
	}

	fn ensure_tab(&self, tab_id: TabId) -> Result<()> {
		self.ensure_browser()?;
		if self.state.tab(tab_id).is_none() {
			return Err(BridgeError::TabNotFound(tab_id));
		}
		Ok(())
	}

	/// Marks the browser gone and rejects everything in flight.
	fn teardown_link(&mut self, link: LinkId) -> usize {
		self.state.mark_disconnected();
		let drained = self.sessions.drain_all(&BridgeError::ConnectionClosed);
		warn!(target: "pagebridge.bridge", %link, drained, "extension connection lost");
		drained
	}
}

fn calls(session: &mut Session) -> &mut PendingMap<String, CallReply> {
	&mut session.calls
}

fn opens(session: &mut Session) -> &mut PendingMap<String, TabRecord> {
	&mut session.opens
}

fn closes(session: &mut Session) -> &mut PendingMap<TabId, ()> {
	&mut session.closes
}

/// Session-aware front door to the browser extension.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Bridge {
	core: Arc<Mutex<Core>>,
	config: Arc<BridgeConfig>,
}

impl Bridge {
	pub fn new(config: BridgeConfig) -> Self {
		Self {
			core: Arc::new(Mutex::new(Core::default())),
			config: Arc::new(config),
		}
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	// -- extension link --

	/// Accepts an extension connection whose outbound frames are drained from
	/// the receiving half of `tx`.
	///
	/// Fails with [`BridgeError::ExtensionAlreadyAttached`] while another link
	/// is live. A link whose transport already went away is torn down first.
	pub fn attach_extension(&self, tx: mpsc::UnboundedSender<OutboundMessage>) -> Result<LinkId> {
		let mut core = self.core.lock();
		if !core.gateway.is_attached() {
			if let Some(stale) = core.gateway.current_link() {
				core.gateway.detach(stale);
				core.teardown_link(stale);
			}
		}
		let link = core.gateway.attach(tx)?;
		info!(target: "pagebridge.bridge", %link, "extension connected");
		Ok(link)
	}

	/// Drops `link` and rejects every pending operation with
	/// [`BridgeError::ConnectionClosed`]. Returns how many were rejected.
	///
	/// A link that was already replaced is ignored.
	pub fn detach_extension(&self, link: LinkId) -> usize {
		let mut core = self.core.lock();
		if !core.gateway.detach(link) {
			debug!(target: "pagebridge.bridge", %link, "stale link detach ignored");
			return 0;
		}
		core.teardown_link(link)
	}

	pub fn is_extension_attached(&self) -> bool {
		self.core.lock().gateway.is_attached()
	}

	/// Parses and routes one text frame from the extension.
	///
	/// Malformed frames are reported and otherwise ignored; the link stays up.
	pub fn handle_extension_text(&self, raw: &str) -> Result<()> {
		let message = InboundMessage::from_json(raw).map_err(|err| {
			warn!(target: "pagebridge.bridge", error = %err, "malformed extension frame");
			BridgeError::from(err)
		})?;
		self.dispatch(message);
		Ok(())
	}

	pub fn dispatch(&self, message: InboundMessage) {
		let mut core = self.core.lock();
		router::route(&mut core, message);
	}

	// -- client operations --

	/// Asks the extension to report its browser.
	///
	/// Only one connect per session may be outstanding.
	pub async fn connect(&self, session_id: &str) -> Result<ConnectInfo> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.gateway.ensure_attached()?;

			let session = core.sessions.get_or_create(session_id, Instant::now());
			if session.connect_in_progress() {
				return Err(BridgeError::in_progress("Connect"));
			}

			let (mut pending, rx) = Pending::channel();
			let op = pending.op();
			let owner = session_id.to_string();
			pending.set_timer(self.arm_timer(self.config.connect_timeout(), move |core| {
				if let Some(session) = core.sessions.peek_mut(&owner) {
					if session.connect.expire(op, BridgeError::Timeout(CONNECT_TIMEOUT.to_string())) {
						session.finish_connect();
						debug!(target: "pagebridge.bridge", session = %owner, "connect timed out");
					}
				}
			}));
			if let Err(pending) = session.connect.occupy(pending) {
				pending.discard();
				return Err(BridgeError::in_progress("Connect"));
			}
			session.begin_connect();

			let message = OutboundMessage::Connect {
				session_id: session_id.to_string(),
			};
			if let Err(err) = core.gateway.send(message) {
				if let Some(pending) = session.connect.take(op) {
					pending.discard();
				}
				session.finish_connect();
				return Err(err);
			}
			debug!(target: "pagebridge.bridge", session = session_id, "connect requested");
			rx
		};
		await_reply(rx).await
	}

	/// Opens `url` in a new tab and resolves with the created tab.
	pub async fn open_tab(&self, session_id: &str, url: &str) -> Result<TabRecord> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.ensure_browser()?;

			let request_id = core.sessions.get_or_create(session_id, Instant::now()).next_token(TokenKind::Open);
			let message = OutboundMessage::OpenTab {
				session_id: session_id.to_string(),
				request_id: request_id.clone(),
				url: url.to_string(),
			};
			self.register(
				core,
				session_id,
				opens,
				request_id,
				self.config.open_tab_timeout(),
				OPEN_TAB_TIMEOUT,
				message,
			)?
		};
		await_reply(rx).await
	}

	/// Brings a tab to the front and resolves with its current record.
	pub async fn focus_tab(&self, session_id: &str, tab_id: TabId) -> Result<TabRecord> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.ensure_tab(tab_id)?;

			let request_id = core.sessions.get_or_create(session_id, Instant::now()).next_token(TokenKind::Focus);
			let message = OutboundMessage::FocusTab {
				session_id: session_id.to_string(),
				request_id: request_id.clone(),
				tab_id,
			};
			self.register(
				core,
				session_id,
				opens,
				request_id,
				self.config.focus_tab_timeout(),
				FOCUS_TAB_TIMEOUT,
				message,
			)?
		};
		await_reply(rx).await
	}

	/// Closes a tab. At most one close per tab per session may be pending.
	pub async fn close_tab(&self, session_id: &str, tab_id: TabId) -> Result<()> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.ensure_tab(tab_id)?;

			let session = core.sessions.get_or_create(session_id, Instant::now());
			if session.closes.contains(&tab_id) {
				return Err(BridgeError::in_progress(format!("Close of tab {tab_id}")));
			}
			let message = OutboundMessage::CloseTab {
				session_id: session_id.to_string(),
				tab_id,
			};
			self.register(
				core,
				session_id,
				closes,
				tab_id,
				self.config.close_tab_timeout(),
				CLOSE_TAB_TIMEOUT,
				message,
			)?
		};
		await_reply(rx).await
	}

	/// Invokes a tool exposed by the page in `tab_id`.
	pub async fn call_page_tool(&self, session_id: &str, tab_id: TabId, tool_name: &str, args: Value) -> Result<Value> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.ensure_tab(tab_id)?;

			let call_id = core.sessions.get_or_create(session_id, Instant::now()).next_token(TokenKind::Call);
			let message = OutboundMessage::CallTool {
				session_id: session_id.to_string(),
				call_id: call_id.clone(),
				tab_id,
				tool_name: tool_name.to_string(),
				args,
			};
			debug!(target: "pagebridge.bridge", session = session_id, %call_id, tool = tool_name, "calling page tool");
			self.register(
				core,
				session_id,
				calls,
				call_id,
				self.config.tool_call_timeout(),
				TOOL_CALL_TIMEOUT,
				message,
			)?
		};
		match await_reply(rx).await? {
			CallReply::ToolResult(value) => Ok(value),
			CallReply::Tools(tools) => Ok(serde_json::to_value(tools)?),
		}
	}

	/// Asks the page in `tab_id` for the tools it exposes.
	///
	/// The discovered list also replaces the tab's cached tools.
	pub async fn discover_tools_for_tab(&self, session_id: &str, tab_id: TabId) -> Result<Vec<ToolDescriptor>> {
		let rx = {
			let mut guard = self.core.lock();
			let core = &mut *guard;
			core.ensure_tab(tab_id)?;

			let call_id = core.sessions.get_or_create(session_id, Instant::now()).next_token(TokenKind::Discover);
			let message = OutboundMessage::DiscoverTools {
				session_id: session_id.to_string(),
				call_id: call_id.clone(),
				tab_id,
			};
			self.register(
				core,
				session_id,
				calls,
				call_id,
				self.config.discover_timeout(),
				DISCOVER_TIMEOUT,
				message,
			)?
		};
		match await_reply(rx).await? {
			CallReply::Tools(tools) => Ok(tools),
			CallReply::ToolResult(value) => Ok(serde_json::from_value(value)?),
		}
	}

	// -- reads --

	pub fn browser_state(&self) -> BrowserState {
		self.core.lock().state.clone()
	}

	pub fn list_tabs(&self) -> Vec<TabRecord> {
		self.core.lock().state.tabs().cloned().collect()
	}

	pub fn session_ids(&self) -> Vec<String> {
		self.core.lock().sessions.ids()
	}

	pub fn session_snapshots(&self) -> Vec<SessionSnapshot> {
		self.core.lock().sessions.list_all(Instant::now())
	}

	// -- session lifecycle --

	pub fn create_session(&self, session_id: &str) -> Result<()> {
		self.core.lock().sessions.create(session_id, Instant::now()).map(|_| ())
	}

	/// Rejects the session's pending operations with
	/// [`BridgeError::SessionClosed`] and forgets it.
	pub fn delete_session(&self, session_id: &str) -> Option<usize> {
		let drained = self.core.lock().sessions.delete(session_id);
		if let Some(drained) = drained {
			info!(target: "pagebridge.bridge", session = session_id, drained, "session ended");
		}
		drained
	}

	/// Evicts sessions idle past the configured threshold.
	pub fn sweep_idle_sessions(&self) -> usize {
		let evicted = self
			.core
			.lock()
			.sessions
			.sweep_idle(Instant::now(), self.config.session_idle_timeout());
		if evicted > 0 {
			info!(target: "pagebridge.bridge", evicted, "idle sessions evicted");
		}
		evicted
	}

	/// Runs [`sweep_idle_sessions`](Self::sweep_idle_sessions) every sweep
	/// interval until the returned handle is stopped.
	pub fn start_idle_sweeper(&self) -> IdleSweeper {
		let (stop_tx, mut stop_rx) = watch::channel(false);
		let bridge = self.clone();
		let period = self.config.sweep_interval();

		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = ticker.tick() => {
						bridge.sweep_idle_sessions();
					}
					changed = stop_rx.changed() => {
						if changed.is_err() || *stop_rx.borrow() {
							break;
						}
					}
				}
			}
			debug!(target: "pagebridge.bridge", "idle sweeper stopped");
		});

		IdleSweeper { stop: stop_tx, handle }
	}

	// -- internals --

	/// Spawns a task that runs `on_fire` under the lock after `after`.
	///
	/// The task holds only a weak reference, so it never keeps the bridge alive.
	fn arm_timer<F>(&self, after: Duration, on_fire: F) -> AbortHandle
	where
		F: FnOnce(&mut Core) + Send + 'static,
	{
		let core: Weak<Mutex<Core>> = Arc::downgrade(&self.core);
		tokio::spawn(async move {
			tokio::time::sleep(after).await;
			if let Some(core) = core.upgrade() {
				let mut guard = core.lock();
				on_fire(&mut *guard);
			}
		})
		.abort_handle()
	}

	/// Registers a keyed pending entry with its timeout, then queues
	/// `message`. A failed send rolls the registration back.
	#[allow(clippy::too_many_arguments)]
	fn register<K, T>(
		&self,
		core: &mut Core,
		session_id: &str,
		select: fn(&mut Session) -> &mut PendingMap<K, T>,
		key: K,
		timeout: Duration,
		timeout_message: &'static str,
		message: OutboundMessage,
	) -> Result<Reply<T>>
	where
		K: Eq + Hash + Clone + Send + 'static,
		T: Send + 'static,
	{
		let (mut pending, rx) = Pending::channel();
		let op = pending.op();
		let owner = session_id.to_string();
		let timer_key = key.clone();
		pending.set_timer(self.arm_timer(timeout, move |core| {
			if let Some(session) = core.sessions.peek_mut(&owner) {
				if select(session).expire(&timer_key, op, BridgeError::Timeout(timeout_message.to_string())) {
					debug!(target: "pagebridge.bridge", session = %owner, timeout_message, "operation timed out");
				}
			}
		}));

		let session = core.sessions.get_or_create(session_id, Instant::now());
		if let Err(pending) = select(session).insert(key.clone(), pending) {
			pending.discard();
			return Err(BridgeError::in_progress(message.kind()));
		}

		if let Err(err) = core.gateway.send(message) {
			if let Some(pending) = select(session).take(&key, op) {
				pending.discard();
			}
			return Err(err);
		}
		Ok(rx)
	}
}

impl std::fmt::Debug for Bridge {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Bridge").field("config", &self.config).finish_non_exhaustive()
	}
}

async fn await_reply<T>(rx: Reply<T>) -> Result<T> {
	rx.await.unwrap_or(Err(BridgeError::ConnectionClosed))
}

/// Handle to the background idle-session sweeper.
#[derive(Debug)]
pub struct IdleSweeper {
	stop: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

impl IdleSweeper {
	/// Signals the sweeper and waits for it to exit.
	pub async fn stop(self) {
		let _ = self.stop.send(true);
		let _ = self.handle.await;
	}
}
