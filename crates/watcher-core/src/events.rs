//! Push-based watching over a notification channel.

use crate::error::WatchError;
use crate::request::{WatchOutcome, WatchRequest};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use watcher_types::{
	AccountAddress, ChannelError, NotificationChannel, Topic, TransactionEvent, TransactionHash,
};

/// Waits for a transaction by listening to an account's event feed.
///
/// The contract matches [`TransactionWatcher`](crate::TransactionWatcher):
/// the watch resolves on the target group or on failure, and times out
/// after `interval * max_attempts`. The first matching event resolves the
/// watch; subscriptions are released when it returns, so repeated or late
/// events for the same hash are never delivered to the caller.
#[derive(Clone)]
pub struct EventWatcher {
	channel: Arc<dyn NotificationChannel>,
}

impl EventWatcher {
	pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
		Self { channel }
	}

	pub async fn wait(
		&self,
		account: &AccountAddress,
		request: &WatchRequest,
	) -> Result<WatchOutcome, WatchError> {
		self.wait_until_cancelled(account, request, &CancellationToken::new())
			.await
	}

	pub async fn wait_until_cancelled(
		&self,
		account: &AccountAddress,
		request: &WatchRequest,
		token: &CancellationToken,
	) -> Result<WatchOutcome, WatchError> {
		request.validate()?;

		let target_topic = Topic::for_target(request.target).ok_or_else(|| {
			WatchError::InvalidRequest(format!("no topic for '{}'", request.target))
		})?;

		let target_events = self.channel.subscribe(account, target_topic).await?;
		let failures = self.channel.subscribe(account, Topic::Status).await?;
		let mut events = futures::stream::select(target_events, failures);

		info!(
			tx_hash = %request.hash.short(),
			account = %account,
			topic = %target_topic,
			"Listening for transaction events"
		);

		let deadline = tokio::time::sleep(request.budget());
		tokio::pin!(deadline);

		loop {
			tokio::select! {
				biased;
				_ = token.cancelled() => return Err(WatchError::Cancelled),
				_ = &mut deadline => {
					warn!(tx_hash = %request.hash.short(), "No matching event before deadline");
					return Ok(WatchOutcome::TimedOut);
				}
				next = events.next() => match next {
					Some(Ok(event)) => {
						if let Some(outcome) = resolve(&event, &request.hash) {
							info!(
								tx_hash = %request.hash.short(),
								topic = %event.topic,
								"Transaction event received"
							);
							return Ok(outcome);
						}
						debug!(tx_hash = %event.hash.short(), topic = %event.topic, "Ignoring unrelated event");
					}
					Some(Err(e)) => return Err(WatchError::Channel(e)),
					None => return Err(WatchError::Channel(ChannelError::Closed)),
				}
			}
		}
	}
}

fn resolve(event: &TransactionEvent, hash: &TransactionHash) -> Option<WatchOutcome> {
	if event.hash != *hash {
		return None;
	}
	let status = event.status();
	match event.topic {
		Topic::Status => Some(WatchOutcome::Failed(status)),
		_ => Some(WatchOutcome::Reached(status)),
	}
}

/// Passes each `(topic, hash)` pair through once, dropping repeats.
///
/// Nodes may deliver the same event more than once, for example after a
/// reconnect; consumers that act on every event should read through this.
pub fn unique_events<S>(events: S) -> impl Stream<Item = Result<TransactionEvent, ChannelError>>
where
	S: Stream<Item = Result<TransactionEvent, ChannelError>>,
{
	let mut seen = HashSet::new();
	events.filter(move |item| {
		let keep = match item {
			Ok(event) => seen.insert((event.topic, event.hash)),
			Err(_) => true,
		};
		futures::future::ready(keep)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::collections::HashMap;
	use std::sync::Mutex;
	use std::time::Duration;
	use tokio::sync::mpsc;
	use tokio_stream::wrappers::UnboundedReceiverStream;
	use watcher_types::{EventStream, StatusGroup};

	type Sender = mpsc::UnboundedSender<Result<TransactionEvent, ChannelError>>;

	/// In-memory feed; tests publish events per topic.
	#[derive(Default)]
	struct MemoryChannel {
		subscribers: Mutex<HashMap<Topic, Vec<Sender>>>,
	}

	impl MemoryChannel {
		fn publish(&self, event: TransactionEvent) -> usize {
			let mut subscribers = self.subscribers.lock().unwrap();
			let senders = subscribers.entry(event.topic).or_default();
			senders.retain(|s| s.send(Ok(event.clone())).is_ok());
			senders.len()
		}

		fn live_subscribers(&self, topic: Topic) -> usize {
			let mut subscribers = self.subscribers.lock().unwrap();
			let senders = subscribers.entry(topic).or_default();
			senders.retain(|s| !s.is_closed());
			senders.len()
		}
	}

	#[async_trait]
	impl NotificationChannel for MemoryChannel {
		async fn subscribe(
			&self,
			_account: &AccountAddress,
			topic: Topic,
		) -> Result<EventStream, ChannelError> {
			let (tx, rx) = mpsc::unbounded_channel();
			self.subscribers
				.lock()
				.unwrap()
				.entry(topic)
				.or_default()
				.push(tx);
			Ok(Box::pin(UnboundedReceiverStream::new(rx)))
		}
	}

	fn account() -> AccountAddress {
		"TBIL6D6RURP45YQRWV6Q7YVWIIPLQGLZQFHWFEQ".parse().unwrap()
	}

	fn event(topic: Topic, hash: TransactionHash) -> TransactionEvent {
		TransactionEvent {
			topic,
			hash,
			height: (topic == Topic::ConfirmedAdded).then_some(10),
			code: (topic == Topic::Status).then(|| "Failure_Core_Past_Deadline".to_string()),
		}
	}

	const HASH: TransactionHash = TransactionHash([0x11; 32]);
	const OTHER: TransactionHash = TransactionHash([0x22; 32]);

	#[tokio::test(start_paused = true)]
	async fn test_resolves_once_on_matching_event() {
		let channel = Arc::new(MemoryChannel::default());
		let watcher = EventWatcher::new(channel.clone());
		let request = WatchRequest::new(HASH, StatusGroup::Confirmed);

		let publisher = channel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(1)).await;
			publisher.publish(event(Topic::ConfirmedAdded, OTHER));
			publisher.publish(event(Topic::ConfirmedAdded, HASH));
			publisher.publish(event(Topic::ConfirmedAdded, HASH));
		});

		let outcome = watcher.wait(&account(), &request).await.unwrap();
		match outcome {
			WatchOutcome::Reached(status) => {
				assert_eq!(status.group, StatusGroup::Confirmed);
				assert_eq!(status.hash, Some(HASH));
				assert_eq!(status.height, Some(10));
			}
			other => panic!("expected reached, got {:?}", other),
		}

		// Streams were dropped on return, so nobody is left listening
		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(channel.live_subscribers(Topic::ConfirmedAdded), 0);
		assert_eq!(channel.live_subscribers(Topic::Status), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_status_event_fails_watch() {
		let channel = Arc::new(MemoryChannel::default());
		let watcher = EventWatcher::new(channel.clone());
		let request = WatchRequest::new(HASH, StatusGroup::Unconfirmed);

		let publisher = channel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			publisher.publish(event(Topic::Status, HASH));
		});

		let outcome = watcher.wait(&account(), &request).await.unwrap();
		match outcome {
			WatchOutcome::Failed(status) => assert_eq!(status.code, "Failure_Core_Past_Deadline"),
			other => panic!("expected failure, got {:?}", other),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_after_budget() {
		let channel = Arc::new(MemoryChannel::default());
		let watcher = EventWatcher::new(channel.clone());
		let request = WatchRequest::new(HASH, StatusGroup::Confirmed).with_max_attempts(5);
		let start = tokio::time::Instant::now();

		let outcome = watcher.wait(&account(), &request).await.unwrap();

		assert_eq!(outcome, WatchOutcome::TimedOut);
		assert_eq!(start.elapsed(), Duration::from_secs(5));
	}

	#[tokio::test(start_paused = true)]
	async fn test_closed_feed_is_a_channel_error() {
		let channel = Arc::new(MemoryChannel::default());
		let watcher = EventWatcher::new(channel.clone());
		let request = WatchRequest::new(HASH, StatusGroup::Confirmed);

		let publisher = channel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			publisher.subscribers.lock().unwrap().clear();
		});

		let result = watcher.wait(&account(), &request).await;
		assert_eq!(result, Err(WatchError::Channel(ChannelError::Closed)));
	}

	#[tokio::test]
	async fn test_unique_events_drops_repeats() {
		let items = vec![
			Ok(event(Topic::UnconfirmedAdded, HASH)),
			Ok(event(Topic::UnconfirmedAdded, HASH)),
			Ok(event(Topic::ConfirmedAdded, HASH)),
			Err(ChannelError::Closed),
			Ok(event(Topic::ConfirmedAdded, HASH)),
			Ok(event(Topic::ConfirmedAdded, OTHER)),
		];

		let unique: Vec<_> = unique_events(futures::stream::iter(items)).collect().await;

		assert_eq!(unique.len(), 4);
		assert_eq!(unique[0].as_ref().unwrap().topic, Topic::UnconfirmedAdded);
		assert_eq!(unique[1].as_ref().unwrap().topic, Topic::ConfirmedAdded);
		assert!(unique[2].is_err());
		assert_eq!(unique[3].as_ref().unwrap().hash, OTHER);
	}
}
