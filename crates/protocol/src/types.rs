//! Value types shared by inbound and outbound extension messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chrome tab identifier as reported by `chrome.tabs`.
pub type TabId = i64;

/// Browser identity reported by the extension when it connects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
	/// Product name, e.g. `"Chrome"`.
	#[serde(default)]
	pub name: String,
	/// Product version string, e.g. `"120.0"`.
	#[serde(default)]
	pub version: String,
}

/// A tool a page exposes to the automation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
	pub name: String,
	#[serde(default)]
	pub description: String,
	/// JSON Schema object describing the tool arguments.
	#[serde(default = "empty_object_schema")]
	pub input_schema: Value,
}

fn empty_object_schema() -> Value {
	serde_json::json!({ "type": "object", "properties": {} })
}

/// Cached metadata for one open browser tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
	pub id: TabId,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	/// Tools the page currently exposes; empty until discovered.
	#[serde(default)]
	pub tools: Vec<ToolDescriptor>,
}

impl TabRecord {
	pub fn new(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			id,
			title: title.into(),
			url: url.into(),
			tools: Vec::new(),
		}
	}
}
