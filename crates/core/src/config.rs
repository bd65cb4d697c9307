//! Timeouts and eviction policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bridge tuning knobs. All durations are milliseconds on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	pub connect_timeout_ms: u64,
	pub open_tab_timeout_ms: u64,
	pub focus_tab_timeout_ms: u64,
	pub close_tab_timeout_ms: u64,
	pub tool_call_timeout_ms: u64,
	pub discover_timeout_ms: u64,
	/// Sessions idle longer than this are evicted by the sweeper.
	pub session_idle_timeout_ms: u64,
	pub sweep_interval_ms: u64,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			connect_timeout_ms: 5_000,
			open_tab_timeout_ms: 30_000,
			focus_tab_timeout_ms: 5_000,
			close_tab_timeout_ms: 5_000,
			tool_call_timeout_ms: 30_000,
			discover_timeout_ms: 10_000,
			session_idle_timeout_ms: 30 * 60 * 1_000,
			sweep_interval_ms: 60_000,
		}
	}
}

impl BridgeConfig {
	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	pub fn open_tab_timeout(&self) -> Duration {
		Duration::from_millis(self.open_tab_timeout_ms)
	}

	pub fn focus_tab_timeout(&self) -> Duration {
		Duration::from_millis(self.focus_tab_timeout_ms)
	}

	pub fn close_tab_timeout(&self) -> Duration {
		Duration::from_millis(self.close_tab_timeout_ms)
	}

	pub fn tool_call_timeout(&self) -> Duration {
		Duration::from_millis(self.tool_call_timeout_ms)
	}

	pub fn discover_timeout(&self) -> Duration {
		Duration::from_millis(self.discover_timeout_ms)
	}

	pub fn session_idle_timeout(&self) -> Duration {
		Duration::from_millis(self.session_idle_timeout_ms)
	}

	/// Never zero; a zero period would spin the sweeper.
	pub fn sweep_interval(&self) -> Duration {
		Duration::from_millis(self.sweep_interval_ms.max(1))
	}
}
