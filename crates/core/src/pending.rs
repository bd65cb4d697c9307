//! Pending-operation bookkeeping.
//!
//! A [`Pending`] owns the sending half of a oneshot channel and the abort
//! handle of its timeout task. Settling consumes it, so a continuation can
//! only ever fire once. Every entry also carries an [`OpId`]: a timeout task
//! only expires the entry stamped with its own id, which keeps a stale timer
//! from completing a later operation that reused the same key.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::{BridgeError, Result};

/// Process-unique identity of one issued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(u64);

impl OpId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// Receiving half handed to the caller awaiting the outcome.
pub(crate) type Reply<T> = oneshot::Receiver<Result<T>>;

/// One outstanding operation.
pub(crate) struct Pending<T> {
	op: OpId,
	tx: oneshot::Sender<Result<T>>,
	timer: Option<AbortHandle>,
}

impl<T> Pending<T> {
	pub(crate) fn channel() -> (Self, Reply<T>) {
		let (tx, rx) = oneshot::channel();
		let pending = Self {
			op: OpId::next(),
			tx,
			timer: None,
		};
		(pending, rx)
	}

	pub(crate) fn op(&self) -> OpId {
		self.op
	}

	pub(crate) fn set_timer(&mut self, timer: AbortHandle) {
		self.timer = Some(timer);
	}

	/// Cancels the timer, then delivers `outcome`.
	///
	/// A dropped receiver (caller gave up) is not an error.
	pub(crate) fn settle(mut self, outcome: Result<T>) {
		if let Some(timer) = self.timer.take() {
			timer.abort();
		}
		let _ = self.tx.send(outcome);
	}

	/// Delivers a timeout from inside the timer task itself.
	fn expire(mut self, err: BridgeError) {
		self.timer = None;
		let _ = self.tx.send(Err(err));
	}

	/// Drops the entry without notifying the caller.
	///
	/// Only for rolling back a registration whose request never left; the
	/// caller gets the send error directly instead.
	pub(crate) fn discard(mut self) {
		if let Some(timer) = self.timer.take() {
			timer.abort();
		}
	}
}

/// Keyed container of pending operations of one kind.
pub(crate) struct PendingMap<K, T> {
	entries: HashMap<K, Pending<T>>,
}

impl<K, T> Default for PendingMap<K, T> {
	fn default() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}
}

impl<K: Eq + Hash, T> PendingMap<K, T> {
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.entries.contains_key(key)
	}

	/// Stores `pending` under `key`, handing it back if the key is taken.
	pub(crate) fn insert(&mut self, key: K, pending: Pending<T>) -> std::result::Result<(), Pending<T>> {
		if self.entries.contains_key(&key) {
			return Err(pending);
		}
		self.entries.insert(key, pending);
		Ok(())
	}

	/// Settles the entry under `key`. Absent keys are a no-op.
	pub(crate) fn complete<Q>(&mut self, key: &Q, outcome: Result<T>) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		match self.entries.remove(key) {
			Some(pending) => {
				pending.settle(outcome);
				true
			}
			None => false,
		}
	}

	/// Times out the entry under `key` if it is still operation `op`.
	pub(crate) fn expire<Q>(&mut self, key: &Q, op: OpId, err: BridgeError) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		if self.entries.get(key).is_none_or(|p| p.op != op) {
			return false;
		}
		match self.entries.remove(key) {
			Some(pending) => {
				pending.expire(err);
				true
			}
			None => false,
		}
	}

	/// Removes the entry under `key` if it is still operation `op`.
	pub(crate) fn take<Q>(&mut self, key: &Q, op: OpId) -> Option<Pending<T>>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		if self.entries.get(key).is_none_or(|p| p.op != op) {
			return None;
		}
		self.entries.remove(key)
	}

	/// Rejects every entry with `err` and empties the container.
	pub(crate) fn drain(&mut self, err: &BridgeError) -> usize {
		let count = self.entries.len();
		for (_, pending) in self.entries.drain() {
			pending.settle(Err(err.clone()));
		}
		count
	}
}

/// Container holding at most one pending operation.
pub(crate) struct PendingSlot<T> {
	slot: Option<Pending<T>>,
}

impl<T> Default for PendingSlot<T> {
	fn default() -> Self {
		Self { slot: None }
	}
}

impl<T> PendingSlot<T> {
	pub(crate) fn is_occupied(&self) -> bool {
		self.slot.is_some()
	}

	pub(crate) fn occupy(&mut self, pending: Pending<T>) -> std::result::Result<(), Pending<T>> {
		if self.slot.is_some() {
			return Err(pending);
		}
		self.slot = Some(pending);
		Ok(())
	}

	pub(crate) fn complete(&mut self, outcome: Result<T>) -> bool {
		match self.slot.take() {
			Some(pending) => {
				pending.settle(outcome);
				true
			}
			None => false,
		}
	}

	pub(crate) fn expire(&mut self, op: OpId, err: BridgeError) -> bool {
		match self.slot.take_if(|p| p.op == op) {
			Some(pending) => {
				pending.expire(err);
				true
			}
			None => false,
		}
	}

	pub(crate) fn take(&mut self, op: OpId) -> Option<Pending<T>> {
		self.slot.take_if(|p| p.op == op)
	}

	pub(crate) fn drain(&mut self, err: &BridgeError) -> usize {
		usize::from(self.complete(Err(err.clone())))
	}
}
