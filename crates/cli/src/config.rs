//! Host configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagebridge::BridgeConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::ListenArgs;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 19988;

/// Everything `serve` needs: where to listen plus the bridge timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
	pub host: String,
	pub port: u16,
	#[serde(flatten)]
	pub bridge: BridgeConfig,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			host: DEFAULT_HOST.to_string(),
			port: DEFAULT_PORT,
			bridge: BridgeConfig::default(),
		}
	}
}

impl HostConfig {
	/// Loads `explicit` if given (it must exist), else the default location if
	/// present, else built-in defaults.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => Self::from_file(path),
			None => match default_config_path() {
				Some(path) if path.is_file() => Self::from_file(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let raw =
			std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config = serde_json::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))?;
		debug!(target: "pagebridge.config", path = %path.display(), "loaded config");
		Ok(config)
	}

	/// Command-line flags win over file values.
	pub fn apply(&mut self, args: &ListenArgs) {
		if let Some(host) = &args.host {
			self.host.clone_from(host);
		}
		if let Some(port) = args.port {
			self.port = port;
		}
	}
}

pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("pagebridge").join("config.json"))
}
