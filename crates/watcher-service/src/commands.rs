//! Subcommand handlers.

use crate::cli::WatchArgs;
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watcher_config::{ConfigLoader, NodeConfig, WatcherConfig};
use watcher_core::{
	unique_events, Announcer, EventWatcher, HybridWatcher, TransactionWatcher, WatchOutcome,
	WatchRequest,
};
use watcher_node::{NodeClient, WsNotificationChannel};
use watcher_types::{
	AccountAddress, ChannelError, NotificationChannel, SignedPayload, StatusLookup, StatusSource,
	Topic, TransactionEvent, TransactionHash,
};

/// Contents of a signed-payload file.
#[derive(Debug, Deserialize)]
struct PayloadFile {
	payload: String,
}

pub async fn status(config: &WatcherConfig, hash: TransactionHash) -> Result<()> {
	let client = NodeClient::from_config(&config.node)?;

	match client.query(&hash).await? {
		StatusLookup::Found(status) => {
			println!("{}", serde_json::to_string_pretty(&status)?);
			if let Some(link) = config.node.explorer_link(&hash) {
				println!("Explorer: {}", link);
			}
		}
		StatusLookup::NotFound => println!("{} is not known to {}", hash, client.base_url()),
	}
	Ok(())
}

pub async fn watch(
	config: &WatcherConfig,
	hash: TransactionHash,
	args: &WatchArgs,
	account: Option<AccountAddress>,
	token: &CancellationToken,
) -> Result<()> {
	let settings = args.apply(&config.watch);
	let request = WatchRequest::from_settings(hash, &settings);
	let poller = TransactionWatcher::new(Arc::new(NodeClient::from_config(&config.node)?));

	let outcome = match account {
		Some(account) => match connect_feed(&config.node).await {
			Ok(channel) => {
				let hybrid = HybridWatcher::new(poller, EventWatcher::new(Arc::new(channel)));
				hybrid.watch(&account, &request, token).await?
			}
			Err(e) => {
				warn!("Event feed unavailable, polling only: {:#}", e);
				poller.watch_until_cancelled(&request, token).await?
			}
		},
		None => poller.watch_until_cancelled(&request, token).await?,
	};

	report(&config.node, &hash, outcome)
}

pub async fn announce(
	config: &WatcherConfig,
	payload_file: &Path,
	hash: TransactionHash,
	args: &WatchArgs,
	token: &CancellationToken,
) -> Result<()> {
	let payload = read_payload(payload_file, hash)?;
	let settings = args.apply(&config.watch);
	let client = NodeClient::from_config(&config.node)?;

	let announcer = Announcer::new(
		Arc::new(client.clone()),
		TransactionWatcher::new(Arc::new(client)),
		settings.clone(),
	);
	let outcome = announcer
		.announce(&payload, settings.target, token)
		.await?;

	report(&config.node, &hash, outcome)
}

pub async fn listen(
	config: &WatcherConfig,
	address: &AccountAddress,
	token: &CancellationToken,
) -> Result<()> {
	let channel = connect_feed(&config.node).await?;

	let mut streams = Vec::new();
	for topic in [Topic::UnconfirmedAdded, Topic::ConfirmedAdded, Topic::Status] {
		streams.push(channel.subscribe(address, topic).await?);
	}
	let events = unique_events(futures::stream::select_all(streams));
	tokio::pin!(events);

	info!(account = %address, "Listening for transaction events");

	loop {
		tokio::select! {
			_ = token.cancelled() => break,
			next = events.next() => match next {
				Some(Ok(event)) => {
					print_event(&config.node, &event);
					if event.topic == Topic::ConfirmedAdded {
						break;
					}
				}
				Some(Err(e)) => return Err(e.into()),
				None => return Err(ChannelError::Closed.into()),
			}
		}
	}

	channel.close().await;
	Ok(())
}

pub fn validate(config: &WatcherConfig) -> Result<()> {
	ConfigLoader::validate_config(config)?;
	let ws_url = config
		.node
		.websocket_url()
		.context("Failed to derive WebSocket URL")?;

	info!("Configuration is valid");
	info!("Node: {}", config.node.url);
	info!("Event feed: {}", ws_url);
	info!(
		"Watch: target={} interval={}ms max_attempts={}",
		config.watch.target, config.watch.interval_ms, config.watch.max_attempts
	);
	Ok(())
}

async fn connect_feed(node: &NodeConfig) -> Result<WsNotificationChannel> {
	let url = node
		.websocket_url()
		.context("Failed to derive WebSocket URL")?;
	let channel = WsNotificationChannel::connect(&url)
		.await
		.with_context(|| format!("Failed to connect to {}", url))?;
	Ok(channel)
}

fn read_payload(path: &Path, hash: TransactionHash) -> Result<SignedPayload> {
	let contents = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read payload file: {:?}", path))?;
	let file: PayloadFile = serde_json::from_str(&contents)
		.with_context(|| format!("Failed to parse payload file: {:?}", path))?;

	let payload = file.payload.trim();
	if payload.is_empty() || !payload.chars().all(|c| c.is_ascii_hexdigit()) {
		anyhow::bail!("Payload in {:?} is not a hex string", path);
	}

	Ok(SignedPayload::new(payload, hash))
}

/// Prints the outcome and turns anything but success into an error.
fn report(node: &NodeConfig, hash: &TransactionHash, outcome: WatchOutcome) -> Result<()> {
	match &outcome {
		WatchOutcome::Reached(status) => {
			println!("{} reached '{}' ({})", hash, status.group, status.code)
		}
		WatchOutcome::Failed(status) => println!("{} failed: {}", hash, status.code),
		WatchOutcome::TimedOut => println!("{} did not settle before the attempt limit", hash),
	}
	if let Some(link) = node.explorer_link(hash) {
		println!("Explorer: {}", link);
	}

	outcome.into_result()?;
	Ok(())
}

fn print_event(node: &NodeConfig, event: &TransactionEvent) {
	let status = event.status();
	match event.height {
		Some(height) => println!("[{}] {} at height {}", event.topic, event.hash, height),
		None => println!("[{}] {} ({})", event.topic, event.hash, status.code),
	}
	if event.topic == Topic::ConfirmedAdded {
		if let Some(link) = node.explorer_link(&event.hash) {
			println!("Explorer: {}", link);
		}
	}
}
