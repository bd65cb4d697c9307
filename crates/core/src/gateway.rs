//! The single outbound path to the browser extension.

use pagebridge_protocol::OutboundMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

/// Identity of one attached extension connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl std::fmt::Display for LinkId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "link-{}", self.0)
	}
}

struct ExtensionLink {
	id: LinkId,
	tx: mpsc::UnboundedSender<OutboundMessage>,
}

/// Holds at most one extension connection and serializes sends onto it.
///
/// The transport owning the socket drains the receiving half of the channel
/// passed to [`attach`](Self::attach).
#[derive(Default)]
pub struct ExtensionGateway {
	link: Option<ExtensionLink>,
	next_link: u64,
}

impl ExtensionGateway {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_attached(&self) -> bool {
		self.link.as_ref().is_some_and(|link| !link.tx.is_closed())
	}

	/// Id of the current link, live or not.
	pub fn current_link(&self) -> Option<LinkId> {
		self.link.as_ref().map(|link| link.id)
	}

	pub fn ensure_attached(&self) -> Result<()> {
		if self.is_attached() {
			Ok(())
		} else {
			Err(BridgeError::NotConnected)
		}
	}

	/// Accepts a new connection unless a live one exists.
	pub fn attach(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> Result<LinkId> {
		if self.is_attached() {
			return Err(BridgeError::ExtensionAlreadyAttached);
		}
		self.next_link += 1;
		let id = LinkId(self.next_link);
		self.link = Some(ExtensionLink { id, tx });
		debug!(target: "pagebridge.gateway", link = %id, "extension attached");
		Ok(id)
	}

	/// Forgets `id` if it is the current link. Stale ids are ignored.
	pub fn detach(&mut self, id: LinkId) -> bool {
		if self.link.as_ref().is_some_and(|link| link.id == id) {
			self.link = None;
			debug!(target: "pagebridge.gateway", link = %id, "extension detached");
			true
		} else {
			false
		}
	}

	/// Queues `message` for the extension; fails fast without a link.
	pub fn send(&self, message: OutboundMessage) -> Result<()> {
		let link = self.link.as_ref().ok_or(BridgeError::NotConnected)?;
		let kind = message.kind();
		link.tx.send(message).map_err(|_| {
			warn!(target: "pagebridge.gateway", link = %link.id, kind, "extension channel closed");
			BridgeError::NotConnected
		})
	}
}

impl std::fmt::Debug for ExtensionGateway {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ExtensionGateway")
			.field("link", &self.link.as_ref().map(|l| l.id))
			.finish()
	}
}
