//! Configuration loading from files and environment.

use crate::types::*;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
	/// Load configuration from file
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<WatcherConfig> {
		let path = path.as_ref();
		info!("Loading configuration from {:?}", path);

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {:?}", path))?;

		let config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			Some("yaml") | Some("yml") => Self::from_yaml(&contents)?,
			_ => anyhow::bail!("Unsupported config format: {:?}", path),
		};

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Load from TOML string
	pub fn from_toml(contents: &str) -> Result<WatcherConfig> {
		toml::from_str(contents).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))
	}

	/// Load from JSON string
	pub fn from_json(contents: &str) -> Result<WatcherConfig> {
		serde_json::from_str(contents).context("Failed to parse JSON")
	}

	/// Load from YAML string
	pub fn from_yaml(contents: &str) -> Result<WatcherConfig> {
		serde_yaml::from_str(contents).context("Failed to parse YAML")
	}

	/// Load from environment variables with optional file override
	pub fn from_env_and_file(file_path: Option<&Path>) -> Result<WatcherConfig> {
		let mut config = if let Some(path) = file_path {
			Self::from_file(path)?
		} else {
			WatcherConfig::default()
		};

		Self::apply_overrides(&mut config, |name| std::env::var(name).ok())?;

		Self::validate_config(&config)?;
		Ok(config)
	}

	/// Apply `WATCHER_*` overrides read through `lookup`
	pub fn apply_overrides<F>(config: &mut WatcherConfig, lookup: F) -> Result<()>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(url) = lookup("WATCHER_NODE_URL") {
			debug!("Overriding node URL from environment");
			config.node.url = url;
		}

		if let Some(ws_url) = lookup("WATCHER_WS_URL") {
			debug!("Overriding WebSocket URL from environment");
			config.node.ws_url = Some(ws_url);
		}

		if let Some(interval) = lookup("WATCHER_INTERVAL_MS") {
			config.watch.interval_ms = interval
				.parse()
				.with_context(|| format!("Invalid WATCHER_INTERVAL_MS: {}", interval))?;
		}

		if let Some(attempts) = lookup("WATCHER_MAX_ATTEMPTS") {
			config.watch.max_attempts = attempts
				.parse()
				.with_context(|| format!("Invalid WATCHER_MAX_ATTEMPTS: {}", attempts))?;
		}

		if let Some(level) = lookup("WATCHER_LOG_LEVEL") {
			config.monitoring.log_level = level;
		}

		Ok(())
	}

	/// Validate configuration
	pub fn validate_config(config: &WatcherConfig) -> Result<()> {
		let node_url = Url::parse(&config.node.url)
			.with_context(|| format!("Invalid node URL: {}", config.node.url))?;
		if !matches!(node_url.scheme(), "http" | "https") {
			anyhow::bail!("Node URL must start with http:// or https://");
		}

		if let Some(ws_url) = &config.node.ws_url {
			let ws = Url::parse(ws_url).with_context(|| format!("Invalid WebSocket URL: {}", ws_url))?;
			if !matches!(ws.scheme(), "ws" | "wss") {
				anyhow::bail!("WebSocket URL must start with ws:// or wss://");
			}
		}

		if config.node.request_timeout_secs == 0 {
			anyhow::bail!("request_timeout_secs must be greater than zero");
		}

		if config.watch.interval_ms == 0 {
			anyhow::bail!("interval_ms must be greater than zero");
		}

		if config.watch.max_attempts == 0 {
			anyhow::bail!("max_attempts must be greater than zero");
		}

		if !config.watch.target.is_watchable() {
			anyhow::bail!("Watch target '{}' is not a waitable status", config.watch.target);
		}

		Ok(())
	}
}

/// Load configuration from standard locations
pub fn load_config() -> Result<WatcherConfig> {
	// Check for config file in order:
	// 1. Environment variable WATCHER_CONFIG_FILE
	// 2. ./watcher.toml
	// 3. ./config/watcher.toml
	// 4. Default config with env overrides

	if let Ok(path) = std::env::var("WATCHER_CONFIG_FILE") {
		return ConfigLoader::from_env_and_file(Some(Path::new(&path)));
	}

	let paths = ["./watcher.toml", "./config/watcher.toml"];

	for path in &paths {
		if Path::new(path).exists() {
			return ConfigLoader::from_env_and_file(Some(Path::new(path)));
		}
	}

	ConfigLoader::from_env_and_file(None)
}
