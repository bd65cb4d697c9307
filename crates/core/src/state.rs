//! Shared record of the browser behind the extension.

use std::collections::BTreeMap;

use pagebridge_protocol::{BrowserInfo, TabId, TabRecord, ToolDescriptor};
use serde::Serialize;

/// Payload a successful `connect` resolves with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
	pub name: String,
	pub version: String,
	pub tab_count: usize,
}

/// Connection status and open tabs, shared by every session.
///
/// Only the message router mutates it; session operations read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserState {
	connected: bool,
	browser: Option<BrowserInfo>,
	tabs: BTreeMap<TabId, TabRecord>,
}

impl BrowserState {
	pub fn is_connected(&self) -> bool {
		self.connected
	}

	pub fn browser(&self) -> Option<&BrowserInfo> {
		self.browser.as_ref()
	}

	pub fn tab(&self, id: TabId) -> Option<&TabRecord> {
		self.tabs.get(&id)
	}

	pub fn tabs(&self) -> impl Iterator<Item = &TabRecord> {
		self.tabs.values()
	}

	pub fn tab_count(&self) -> usize {
		self.tabs.len()
	}

	pub fn connect_info(&self) -> ConnectInfo {
		let browser = self.browser.clone().unwrap_or_default();
		ConnectInfo {
			name: browser.name,
			version: browser.version,
			tab_count: self.tabs.len(),
		}
	}

	pub(crate) fn mark_connected(&mut self, browser: BrowserInfo, tabs: Vec<TabRecord>) {
		self.connected = true;
		self.browser = Some(browser);
		for tab in tabs {
			self.tabs.insert(tab.id, tab);
		}
	}

	/// Tabs have no meaning without a live browser, so they go too.
	pub(crate) fn mark_disconnected(&mut self) {
		self.connected = false;
		self.browser = None;
		self.tabs.clear();
	}

	pub(crate) fn upsert_tab(&mut self, tab: TabRecord) {
		self.tabs.insert(tab.id, tab);
	}

	pub(crate) fn update_tab(&mut self, id: TabId, title: Option<String>, url: Option<String>) -> bool {
		let Some(tab) = self.tabs.get_mut(&id) else {
			return false;
		};
		if let Some(title) = title {
			tab.title = title;
		}
		if let Some(url) = url {
			tab.url = url;
		}
		true
	}

	pub(crate) fn remove_tab(&mut self, id: TabId) -> Option<TabRecord> {
		self.tabs.remove(&id)
	}

	pub(crate) fn set_tools(&mut self, id: TabId, tools: Vec<ToolDescriptor>) -> bool {
		match self.tabs.get_mut(&id) {
			Some(tab) => {
				tab.tools = tools;
				true
			}
			None => false,
		}
	}
}
