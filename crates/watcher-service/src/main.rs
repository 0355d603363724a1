use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use watcher_config::{load_config, ConfigLoader, WatcherConfig};
use watcher_monitoring::{init_tracing, TracingConfig};

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let mut config = load(&args)?;
	if let Some(level) = &args.log_level {
		config.monitoring.log_level = level.clone();
	}
	if args.json_logs {
		config.monitoring.json_logs = true;
	}

	init_tracing(TracingConfig::from_monitoring(&config.monitoring))
		.map_err(|e| anyhow!("{}", e))?;

	let token = CancellationToken::new();
	let shutdown = token.clone();
	tokio::spawn(async move {
		setup_shutdown_signal().await;
		info!("Shutdown signal received, stopping");
		shutdown.cancel();
	});

	match args.command {
		Command::Status { hash } => commands::status(&config, hash).await,
		Command::Watch {
			hash,
			watch,
			account,
		} => commands::watch(&config, hash, &watch, account, &token).await,
		Command::Announce {
			payload_file,
			hash,
			watch,
		} => commands::announce(&config, &payload_file, hash, &watch, &token).await,
		Command::Listen { address } => commands::listen(&config, &address, &token).await,
		Command::Validate => commands::validate(&config),
	}
}

fn load(args: &Args) -> Result<WatcherConfig> {
	match &args.config {
		Some(path) => ConfigLoader::from_env_and_file(Some(path.as_path()))
			.with_context(|| format!("Failed to load configuration from {:?}", path)),
		None => load_config().context("Failed to load configuration"),
	}
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to install Ctrl+C handler: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install signal handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
