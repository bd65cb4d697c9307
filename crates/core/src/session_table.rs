//! The set of live sessions.
//!
//! All methods take the current [`Instant`] explicitly so eviction can be
//! driven by a paused or injected clock.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::session::Session;

/// Point-in-time view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	pub id: String,
	pub age_ms: u64,
	pub idle_ms: u64,
	pub pending: usize,
	pub connect_in_progress: bool,
}

#[derive(Debug, Default)]
pub struct SessionTable {
	sessions: HashMap<String, Session>,
}

impl SessionTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.sessions.contains_key(id)
	}

	/// Inserts a fresh session.
	///
	/// An existing session is never replaced: its pending operations would
	/// be orphaned, so a duplicate id is refused.
	pub fn create(&mut self, id: &str, now: Instant) -> Result<&mut Session> {
		if self.sessions.contains_key(id) {
			return Err(BridgeError::SessionExists(id.to_string()));
		}
		debug!(target: "pagebridge.session", session = id, "session created");
		Ok(self.sessions.entry(id.to_string()).or_insert_with(|| Session::new(id, now)))
	}

	/// Looks up a session and refreshes its last activity.
	pub fn get(&mut self, id: &str, now: Instant) -> Option<&mut Session> {
		let session = self.sessions.get_mut(id)?;
		session.touch(now);
		Some(session)
	}

	pub fn get_or_create(&mut self, id: &str, now: Instant) -> &mut Session {
		let session = self.sessions.entry(id.to_string()).or_insert_with(|| {
			debug!(target: "pagebridge.session", session = id, "session created");
			Session::new(id, now)
		});
		session.touch(now);
		session
	}

	/// Looks up a session without counting it as client activity.
	pub(crate) fn peek_mut(&mut self, id: &str) -> Option<&mut Session> {
		self.sessions.get_mut(id)
	}

	pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
		self.sessions.values_mut()
	}

	/// Drains and removes a session; returns how many operations were rejected.
	///
	/// Unknown ids are a no-op.
	pub fn delete(&mut self, id: &str) -> Option<usize> {
		let mut session = self.sessions.remove(id)?;
		let drained = session.drain(&BridgeError::SessionClosed);
		debug!(target: "pagebridge.session", session = id, drained, "session deleted");
		Some(drained)
	}

	pub fn ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn list_all(&self, now: Instant) -> Vec<SessionSnapshot> {
		let mut snapshots: Vec<SessionSnapshot> = self
			.sessions
			.values()
			.map(|s| SessionSnapshot {
				id: s.id().to_string(),
				age_ms: now.saturating_duration_since(s.created_at()).as_millis() as u64,
				idle_ms: s.idle_for(now).as_millis() as u64,
				pending: s.pending_count(),
				connect_in_progress: s.connect_in_progress(),
			})
			.collect();
		snapshots.sort_by(|a, b| a.id.cmp(&b.id));
		snapshots
	}

	/// Deletes every session idle for longer than `threshold`.
	pub fn sweep_idle(&mut self, now: Instant, threshold: Duration) -> usize {
		let expired: Vec<String> = self
			.sessions
			.values()
			.filter(|s| s.idle_for(now) > threshold)
			.map(|s| s.id().to_string())
			.collect();
		for id in &expired {
			self.delete(id);
		}
		expired.len()
	}

	/// Rejects every pending operation of every session, keeping the sessions.
	pub(crate) fn drain_all(&mut self, err: &BridgeError) -> usize {
		self.sessions.values_mut().map(|s| s.drain(err)).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pending::Pending;

	const IDLE: Duration = Duration::from_secs(30 * 60);

	#[test]
	fn test_get_does_not_create() {
		let mut table = SessionTable::new();
		assert!(table.get("s1", Instant::now()).is_none());
		assert!(table.is_empty());
	}

	#[test]
	fn test_get_or_create_touches() {
		let start = Instant::now();
		let mut table = SessionTable::new();
		table.get_or_create("s1", start);
		let later = start + Duration::from_secs(60);
		let session = table.get_or_create("s1", later);

		assert_eq!(session.created_at(), start);
		assert_eq!(session.last_activity(), later);
		assert_eq!(table.len(), 1);
	}

	#[tokio::test]
	async fn test_duplicate_create_keeps_pending() {
		let now = Instant::now();
		let mut table = SessionTable::new();
		let (pending, mut rx) = Pending::channel();
		table.create("s1", now).unwrap().closes.insert(1, pending).ok().unwrap();

		let err = table.create("s1", now).unwrap_err();

		assert_eq!(err, BridgeError::SessionExists("s1".to_string()));
		assert_eq!(table.get("s1", now).unwrap().pending_count(), 1);
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_delete_drains_then_removes() {
		let now = Instant::now();
		let mut table = SessionTable::new();
		let (pending, rx) = Pending::channel();
		table.get_or_create("s1", now).opens.insert("s1_open_1".into(), pending).ok().unwrap();

		assert_eq!(table.delete("s1"), Some(1));
		assert_eq!(table.delete("s1"), None);
		assert!(!table.contains("s1"));
		assert_eq!(rx.await.unwrap(), Err(BridgeError::SessionClosed));
	}

	#[tokio::test]
	async fn test_sweep_idle_evicts_only_stale_sessions() {
		let start = Instant::now();
		let mut table = SessionTable::new();
		let (pending, rx) = Pending::channel();
		table.get_or_create("stale", start).calls.insert("stale_call_1".into(), pending).ok().unwrap();
		table.get_or_create("fresh", start);
		table.get("fresh", start + Duration::from_secs(20 * 60));

		let now = start + IDLE + Duration::from_secs(1);
		assert_eq!(table.sweep_idle(now, IDLE), 1);

		assert_eq!(table.ids(), vec!["fresh".to_string()]);
		assert_eq!(rx.await.unwrap(), Err(BridgeError::SessionClosed));
	}

	#[test]
	fn test_sweep_keeps_session_at_threshold() {
		let start = Instant::now();
		let mut table = SessionTable::new();
		table.get_or_create("s1", start);
		assert_eq!(table.sweep_idle(start + IDLE, IDLE), 0);
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn test_list_all_snapshot() {
		let start = Instant::now();
		let mut table = SessionTable::new();
		table.get_or_create("b", start);
		table.get_or_create("a", start);
		let snapshots = table.list_all(start + Duration::from_millis(1500));

		assert_eq!(snapshots.len(), 2);
		assert_eq!(snapshots[0].id, "a");
		assert_eq!(snapshots[0].idle_ms, 1500);
		assert_eq!(snapshots[1].pending, 0);
	}
}
