//! One client's isolated set of pending operations.

use std::time::Duration;

use pagebridge_protocol::{TabId, TabRecord, ToolDescriptor};
use serde_json::Value;
use tokio::time::Instant;

use crate::call_id::{self, TokenKind};
use crate::error::BridgeError;
use crate::pending::{PendingMap, PendingSlot};
use crate::state::ConnectInfo;

/// What a pending call resolves with.
///
/// Tool calls and tool discovery share the call container because both are
/// correlated by `callId`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallReply {
	ToolResult(Value),
	Tools(Vec<ToolDescriptor>),
}

/// A logical client of the bridge.
pub struct Session {
	id: String,
	created_at: Instant,
	last_activity: Instant,
	call_counter: u64,
	pub(crate) calls: PendingMap<String, CallReply>,
	pub(crate) opens: PendingMap<String, TabRecord>,
	pub(crate) closes: PendingMap<TabId, ()>,
	pub(crate) connect: PendingSlot<ConnectInfo>,
	connect_in_progress: bool,
}

impl Session {
	pub(crate) fn new(id: impl Into<String>, now: Instant) -> Self {
		Self {
			id: id.into(),
			created_at: now,
			last_activity: now,
			call_counter: 0,
			calls: PendingMap::default(),
			opens: PendingMap::default(),
			closes: PendingMap::default(),
			connect: PendingSlot::default(),
			connect_in_progress: false,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn created_at(&self) -> Instant {
		self.created_at
	}

	pub fn last_activity(&self) -> Instant {
		self.last_activity
	}

	pub(crate) fn touch(&mut self, now: Instant) {
		self.last_activity = self.last_activity.max(now);
	}

	pub fn idle_for(&self, now: Instant) -> Duration {
		now.saturating_duration_since(self.last_activity)
	}

	/// Issues the next correlation token for this session.
	pub(crate) fn next_token(&mut self, kind: TokenKind) -> String {
		self.call_counter += 1;
		call_id::generate(&self.id, kind, self.call_counter)
	}

	pub fn connect_in_progress(&self) -> bool {
		self.connect_in_progress
	}

	pub(crate) fn begin_connect(&mut self) {
		self.connect_in_progress = true;
	}

	pub(crate) fn finish_connect(&mut self) {
		self.connect_in_progress = false;
	}

	/// Total outstanding operations across all containers.
	pub fn pending_count(&self) -> usize {
		self.calls.len() + self.opens.len() + self.closes.len() + usize::from(self.connect.is_occupied())
	}

	/// Rejects every pending operation with `err` and empties all containers.
	pub(crate) fn drain(&mut self, err: &BridgeError) -> usize {
		let drained = self.connect.drain(err) + self.calls.drain(err) + self.opens.drain(err) + self.closes.drain(err);
		self.connect_in_progress = false;
		drained
	}
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id)
			.field("call_counter", &self.call_counter)
			.field("pending", &self.pending_count())
			.field("connect_in_progress", &self.connect_in_progress)
			.finish()
	}
}
