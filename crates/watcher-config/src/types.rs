//! Configuration types for the watcher.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use watcher_types::StatusGroup;

pub const DEFAULT_NODE_URL: &str = "https://sym-test-03.opening-line.jp:3001";
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.symbol.fyi";

/// Complete watcher configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatcherConfig {
	/// Node endpoints
	#[serde(default)]
	pub node: NodeConfig,
	/// Polling defaults
	#[serde(default)]
	pub watch: WatchSettings,
	/// Logging
	#[serde(default)]
	pub monitoring: MonitoringConfig,
}

/// Node connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
	/// REST endpoint of the node
	pub url: String,
	/// WebSocket endpoint (derived from `url` when absent)
	#[serde(default)]
	pub ws_url: Option<String>,
	/// Per-request timeout in seconds
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	/// Block explorer base URL used for links
	#[serde(default)]
	pub explorer_url: Option<String>,
}

/// Default parameters for a watch
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchSettings {
	/// Delay before each status query, in milliseconds
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	/// Maximum number of status queries
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Status group to wait for
	#[serde(default = "default_target")]
	pub target: StatusGroup,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
	/// Log level or filter directive
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Emit JSON log lines
	#[serde(default)]
	pub json_logs: bool,
}

fn default_request_timeout_secs() -> u64 {
	10
}

fn default_interval_ms() -> u64 {
	1_000
}

fn default_max_attempts() -> u32 {
	100
}

fn default_target() -> StatusGroup {
	StatusGroup::Confirmed
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_NODE_URL.to_string(),
			ws_url: None,
			request_timeout_secs: default_request_timeout_secs(),
			explorer_url: Some(DEFAULT_EXPLORER_URL.to_string()),
		}
	}
}

impl Default for WatchSettings {
	fn default() -> Self {
		Self {
			interval_ms: default_interval_ms(),
			max_attempts: default_max_attempts(),
			target: default_target(),
		}
	}
}

impl Default for MonitoringConfig {
	fn default() -> Self {
		Self {
			log_level: default_log_level(),
			json_logs: false,
		}
	}
}

impl NodeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	/// WebSocket endpoint of the node.
	///
	/// Uses `ws_url` when set, otherwise swaps the REST scheme for its
	/// WebSocket counterpart and appends `/ws`.
	pub fn websocket_url(&self) -> Result<Url, url::ParseError> {
		if let Some(ws_url) = &self.ws_url {
			return Url::parse(ws_url);
		}

		let rest = Url::parse(&self.url)?;
		let scheme = if rest.scheme() == "https" { "wss" } else { "ws" };
		let host = rest.host_str().unwrap_or_default();
		let port = rest.port().map(|p| format!(":{}", p)).unwrap_or_default();
		let base_path = rest.path().trim_end_matches('/');

		Url::parse(&format!("{}://{}{}{}/ws", scheme, host, port, base_path))
	}

	/// Explorer page for a transaction, if an explorer is configured.
	pub fn explorer_link(&self, hash: &watcher_types::TransactionHash) -> Option<String> {
		self.explorer_url
			.as_ref()
			.map(|base| format!("{}/transactions/{}", base.trim_end_matches('/'), hash))
	}
}

impl WatchSettings {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use watcher_types::TransactionHash;

	#[test]
	fn test_default_config() {
		let config = WatcherConfig::default();
		assert_eq!(config.node.url, DEFAULT_NODE_URL);
		assert_eq!(config.watch.interval(), Duration::from_secs(1));
		assert_eq!(config.watch.max_attempts, 100);
		assert_eq!(config.watch.target, StatusGroup::Confirmed);
		assert_eq!(config.monitoring.log_level, "info");
	}

	#[test]
	fn test_websocket_url_derivation() {
		let node = NodeConfig::default();
		assert_eq!(
			node.websocket_url().unwrap().as_str(),
			"wss://sym-test-03.opening-line.jp:3001/ws"
		);

		let plain = NodeConfig {
			url: "http://localhost:3000/".to_string(),
			..NodeConfig::default()
		};
		assert_eq!(plain.websocket_url().unwrap().as_str(), "ws://localhost:3000/ws");

		let explicit = NodeConfig {
			ws_url: Some("ws://127.0.0.1:9000/feed".to_string()),
			..NodeConfig::default()
		};
		assert_eq!(
			explicit.websocket_url().unwrap().as_str(),
			"ws://127.0.0.1:9000/feed"
		);
	}

	#[test]
	fn test_explorer_link() {
		let node = NodeConfig::default();
		let hash = TransactionHash([0xAB; 32]);
		assert_eq!(
			node.explorer_link(&hash).unwrap(),
			format!("https://testnet.symbol.fyi/transactions/{}", hash)
		);

		let without = NodeConfig {
			explorer_url: None,
			..NodeConfig::default()
		};
		assert!(without.explorer_link(&hash).is_none());
	}
}
