use tracing::info;
use tracing_subscriber::{
	fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use watcher_config::MonitoringConfig;

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
	/// `EnvFilter` directive, e.g. `info` or `info,watcher_node=debug`.
	pub directive: String,
	/// Let `RUST_LOG` override `directive` when it is set.
	pub respect_env: bool,
	pub with_thread_ids: bool,
	pub with_file_and_line: bool,
	pub with_target: bool,
	pub with_span_events: FmtSpan,
	pub json_format: bool,
}

impl Default for TracingConfig {
	fn default() -> Self {
		Self {
			directive: "info".to_string(),
			respect_env: true,
			with_thread_ids: false,
			with_file_and_line: false,
			with_target: true,
			with_span_events: FmtSpan::NONE,
			json_format: false,
		}
	}
}

impl TracingConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_monitoring(config: &MonitoringConfig) -> Self {
		Self::default()
			.with_directive(config.log_level.clone())
			.with_json_format(config.json_logs)
	}

	pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
		self.directive = directive.into();
		self
	}

	pub fn with_json_format(mut self, json: bool) -> Self {
		self.json_format = json;
		self
	}

	pub fn with_env_override(mut self, respect_env: bool) -> Self {
		self.respect_env = respect_env;
		self
	}

	pub fn debug() -> Self {
		Self {
			directive: "debug".to_string(),
			with_thread_ids: true,
			with_file_and_line: true,
			..Self::default()
		}
	}

	pub fn production() -> Self {
		Self {
			with_target: false,
			json_format: true,
			..Self::default()
		}
	}

	/// Filter built from `directive` alone.
	pub fn filter(&self) -> Result<EnvFilter, String> {
		EnvFilter::try_new(&self.directive)
			.map_err(|e| format!("Invalid log directive '{}': {}", self.directive, e))
	}

	fn effective_filter(&self) -> Result<EnvFilter, String> {
		if self.respect_env {
			if let Ok(filter) = EnvFilter::try_from_default_env() {
				return Ok(filter);
			}
		}
		self.filter()
	}
}

/// Initialize tracing with the given configuration
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error>> {
	let filter = config.effective_filter()?;
	let subscriber = tracing_subscriber::registry().with(filter);

	if config.json_format {
		let json_layer = tracing_subscriber::fmt::layer()
			.json()
			.with_span_events(config.with_span_events.clone())
			.with_thread_ids(config.with_thread_ids)
			.with_file(config.with_file_and_line)
			.with_line_number(config.with_file_and_line)
			.with_target(config.with_target);

		subscriber
			.with(json_layer)
			.try_init()
			.map_err(|e| format!("Failed to initialize tracing: {}", e))?;
	} else {
		let fmt_layer = tracing_subscriber::fmt::layer()
			.pretty()
			.with_span_events(config.with_span_events.clone())
			.with_thread_ids(config.with_thread_ids)
			.with_file(config.with_file_and_line)
			.with_line_number(config.with_file_and_line)
			.with_target(config.with_target);

		subscriber
			.with(fmt_layer)
			.try_init()
			.map_err(|e| format!("Failed to initialize tracing: {}", e))?;
	}

	info!(directive = %config.directive, json = config.json_format, "Tracing initialized");
	Ok(())
}
