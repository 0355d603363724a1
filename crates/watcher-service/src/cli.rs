//! Command-line interface definitions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use watcher_config::WatchSettings;
use watcher_types::{AccountAddress, StatusGroup, TransactionHash};

#[derive(Parser, Debug)]
#[command(name = "tx-watcher")]
#[command(about = "Follow Symbol transactions until they confirm or fail", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, global = true, env = "WATCHER_CONFIG_FILE")]
	pub config: Option<PathBuf>,

	/// Log level or filter directive (trace, debug, info, warn, error)
	#[arg(short, long, global = true, env = "WATCHER_LOG_LEVEL")]
	pub log_level: Option<String>,

	/// Emit logs as JSON lines
	#[arg(long, global = true)]
	pub json_logs: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Query a transaction's status once
	Status {
		/// Transaction hash (64 hex characters)
		hash: TransactionHash,
	},

	/// Wait until a transaction reaches a status group
	Watch {
		hash: TransactionHash,

		#[command(flatten)]
		watch: WatchArgs,

		/// Also listen on this account's event feed and take whichever
		/// answer arrives first
		#[arg(long)]
		account: Option<AccountAddress>,
	},

	/// Announce a signed transaction, then wait for it
	Announce {
		/// JSON file with a `payload` field holding the signed transaction
		payload_file: PathBuf,

		/// Hash of the signed transaction
		hash: TransactionHash,

		#[command(flatten)]
		watch: WatchArgs,
	},

	/// Print an account's transaction events until one confirms
	Listen {
		address: AccountAddress,
	},

	/// Validate the configuration
	Validate,
}

/// Per-invocation overrides of the configured watch settings.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct WatchArgs {
	/// Status group to wait for (unconfirmed, partial, confirmed)
	#[arg(long)]
	pub target: Option<StatusGroup>,

	/// Delay before each status query, in milliseconds
	#[arg(long)]
	pub interval_ms: Option<u64>,

	/// Maximum number of status queries
	#[arg(long)]
	pub max_attempts: Option<u32>,
}

impl WatchArgs {
	pub fn apply(&self, settings: &WatchSettings) -> WatchSettings {
		let mut settings = settings.clone();
		if let Some(target) = self.target {
			settings.target = target;
		}
		if let Some(interval_ms) = self.interval_ms {
			settings.interval_ms = interval_ms;
		}
		if let Some(max_attempts) = self.max_attempts {
			settings.max_attempts = max_attempts;
		}
		settings
	}
}
