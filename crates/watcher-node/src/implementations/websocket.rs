//! WebSocket notification channel.
//!
//! The node's feed speaks a small JSON protocol: on connect the node sends
//! `{"uid": ...}`, the client then sends `{"uid", "subscribe": channel}` per
//! channel and receives `{"topic": channel, "data": ...}` frames until it
//! sends `{"uid", "unsubscribe": channel}` or disconnects.
//!
//! One background task owns the socket. Subscriptions are routed inside that
//! task; each subscriber gets its own stream, and a channel is unsubscribed
//! on the wire as soon as its last stream has been dropped.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;
use watcher_types::{
	AccountAddress, ChannelError, EventStream, NotificationChannel, Topic, TransactionEvent,
	TransactionHash,
};

/// Time allowed for the node to send its `uid` after connecting.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How often dropped subscriptions are swept when the feed is quiet.
const SWEEP_INTERVAL: Duration = Duration::from_millis(500);

type EventSender = mpsc::UnboundedSender<Result<TransactionEvent, ChannelError>>;

enum Command {
	Subscribe {
		channel: String,
		topic: Topic,
		events: EventSender,
		ack: oneshot::Sender<Result<(), ChannelError>>,
	},
}

/// Handle to a live connection to a node's event feed.
///
/// Dropping the handle closes the connection.
pub struct WsNotificationChannel {
	uid: String,
	commands: mpsc::Sender<Command>,
	shutdown: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl WsNotificationChannel {
	/// Connects to `url` and waits for the node to assign a connection id.
	pub async fn connect(url: &Url) -> Result<Self, ChannelError> {
		info!(url = %url, "Connecting to node event feed");

		let (ws_stream, _) = connect_async(url.as_str())
			.await
			.map_err(|e| ChannelError::Connect(e.to_string()))?;
		let (write, mut read) = ws_stream.split();

		let handshake = async {
			while let Some(msg) = read.next().await {
				match msg {
					Ok(Message::Text(text)) => {
						return serde_json::from_str::<Hello>(&text)
							.map(|hello| hello.uid)
							.map_err(|e| ChannelError::Protocol(format!("Invalid handshake: {}", e)));
					}
					Ok(Message::Close(_)) => return Err(ChannelError::Closed),
					Ok(_) => continue,
					Err(e) => return Err(ChannelError::Protocol(e.to_string())),
				}
			}
			Err(ChannelError::Closed)
		};

		let uid = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake)
			.await
			.map_err(|_| ChannelError::Connect("Timed out waiting for connection id".to_string()))??;

		info!(uid = %uid, "Event feed connection established");

		let (commands, mailbox) = mpsc::channel(32);
		let shutdown = CancellationToken::new();
		let connection = Connection {
			uid: uid.clone(),
			routes: HashMap::new(),
		};
		let task = tokio::spawn(connection.run(write, read, mailbox, shutdown.clone()));

		Ok(Self {
			uid,
			commands,
			shutdown,
			task: Some(task),
		})
	}

	/// Connection id assigned by the node.
	pub fn uid(&self) -> &str {
		&self.uid
	}

	/// Closes the connection and waits for the background task to finish.
	pub async fn close(mut self) {
		self.shutdown.cancel();
		if let Some(task) = self.task.take() {
			if let Err(e) = task.await {
				warn!("Event feed task ended abnormally: {}", e);
			}
		}
	}
}

impl Drop for WsNotificationChannel {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

#[async_trait]
impl NotificationChannel for WsNotificationChannel {
	async fn subscribe(
		&self,
		account: &AccountAddress,
		topic: Topic,
	) -> Result<EventStream, ChannelError> {
		let (events, receiver) = mpsc::unbounded_channel();
		let (ack, ack_rx) = oneshot::channel();

		self.commands
			.send(Command::Subscribe {
				channel: topic.channel(account),
				topic,
				events,
				ack,
			})
			.await
			.map_err(|_| ChannelError::Closed)?;

		ack_rx.await.map_err(|_| ChannelError::Closed)??;

		Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
	}
}

#[derive(Deserialize)]
struct Hello {
	uid: String,
}

#[derive(Deserialize)]
struct Envelope {
	topic: String,
	#[serde(default)]
	data: serde_json::Value,
}

struct Route {
	topic: Topic,
	subscribers: Vec<EventSender>,
}

struct Connection {
	uid: String,
	routes: HashMap<String, Route>,
}

impl Connection {
	async fn run<W, R>(
		mut self,
		mut write: W,
		mut read: R,
		mut mailbox: mpsc::Receiver<Command>,
		shutdown: CancellationToken,
	) where
		W: futures::Sink<Message> + Unpin,
		W::Error: std::fmt::Display,
		R: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
	{
		let mut sweep = interval(SWEEP_INTERVAL);

		loop {
			tokio::select! {
				_ = shutdown.cancelled() => {
					debug!(uid = %self.uid, "Closing event feed connection");
					let _ = write.send(Message::Close(None)).await;
					break;
				}
				command = mailbox.recv() => {
					let Some(Command::Subscribe { channel, topic, events, ack }) = command else {
						debug!(uid = %self.uid, "All channel handles dropped");
						let _ = write.send(Message::Close(None)).await;
						break;
					};

					let result = self.add_route(&mut write, channel, topic, events).await;
					let _ = ack.send(result);
				}
				msg = read.next() => {
					match msg {
						Some(Ok(Message::Text(text))) => {
							self.dispatch(&text);
							self.sweep(&mut write).await;
						}
						Some(Ok(Message::Close(_))) | None => {
							info!(uid = %self.uid, "Event feed closed by node");
							self.fail_all(ChannelError::Closed);
							break;
						}
						Some(Ok(_)) => {}
						Some(Err(e)) => {
							error!(uid = %self.uid, error = %e, "Event feed error");
							self.fail_all(ChannelError::Protocol(e.to_string()));
							break;
						}
					}
				}
				_ = sweep.tick() => {
					self.sweep(&mut write).await;
				}
			}
		}
	}

	async fn add_route<W>(
		&mut self,
		write: &mut W,
		channel: String,
		topic: Topic,
		events: EventSender,
	) -> Result<(), ChannelError>
	where
		W: futures::Sink<Message> + Unpin,
		W::Error: std::fmt::Display,
	{
		if let Some(route) = self.routes.get_mut(&channel) {
			route.subscribers.push(events);
			return Ok(());
		}

		let frame = serde_json::json!({ "uid": self.uid, "subscribe": channel });
		write
			.send(Message::Text(frame.to_string().into()))
			.await
			.map_err(|e| ChannelError::Protocol(format!("Failed to subscribe: {}", e)))?;

		debug!(uid = %self.uid, channel = %channel, "Subscribed");
		self.routes.insert(
			channel,
			Route {
				topic,
				subscribers: vec![events],
			},
		);
		Ok(())
	}

	fn dispatch(&mut self, text: &str) {
		let envelope: Envelope = match serde_json::from_str(text) {
			Ok(envelope) => envelope,
			Err(e) => {
				warn!(uid = %self.uid, error = %e, "Ignoring malformed frame");
				return;
			}
		};

		let Some(route) = self.routes.get_mut(&envelope.topic) else {
			trace!(uid = %self.uid, topic = %envelope.topic, "Frame for unknown channel");
			return;
		};

		let event = match decode_event(route.topic, &envelope.data) {
			Ok(event) => event,
			Err(e) => {
				warn!(uid = %self.uid, topic = %envelope.topic, "Ignoring undecodable event: {}", e);
				return;
			}
		};

		trace!(uid = %self.uid, tx_hash = %event.hash.short(), topic = %envelope.topic, "Event");
		route
			.subscribers
			.retain(|subscriber| subscriber.send(Ok(event.clone())).is_ok());
	}

	/// Unsubscribes channels whose subscribers have all gone away.
	async fn sweep<W>(&mut self, write: &mut W)
	where
		W: futures::Sink<Message> + Unpin,
		W::Error: std::fmt::Display,
	{
		let mut abandoned = Vec::new();
		for (channel, route) in self.routes.iter_mut() {
			route.subscribers.retain(|subscriber| !subscriber.is_closed());
			if route.subscribers.is_empty() {
				abandoned.push(channel.clone());
			}
		}

		for channel in abandoned {
			self.routes.remove(&channel);
			let frame = serde_json::json!({ "uid": self.uid, "unsubscribe": channel });
			if let Err(e) = write.send(Message::Text(frame.to_string().into())).await {
				warn!(uid = %self.uid, channel = %channel, "Failed to unsubscribe: {}", e);
			} else {
				debug!(uid = %self.uid, channel = %channel, "Unsubscribed");
			}
		}
	}

	fn fail_all(&mut self, error: ChannelError) {
		for (_, route) in self.routes.drain() {
			for subscriber in route.subscribers {
				let _ = subscriber.send(Err(error.clone()));
			}
		}
	}
}

/// Extracts a transaction event from the `data` part of a frame.
fn decode_event(topic: Topic, data: &serde_json::Value) -> Result<TransactionEvent, String> {
	let (hash_field, height_field) = match topic {
		Topic::Status => (data.get("hash"), None),
		_ => {
			let meta = data.get("meta").ok_or("missing meta")?;
			(meta.get("hash"), meta.get("height"))
		}
	};

	let hash: TransactionHash = hash_field
		.and_then(|h| h.as_str())
		.ok_or("missing hash")?
		.parse()
		.map_err(|e| format!("invalid hash: {}", e))?;

	let height = match height_field {
		Some(serde_json::Value::String(s)) => Some(s.parse::<u64>().map_err(|e| e.to_string())?),
		Some(serde_json::Value::Number(n)) => n.as_u64(),
		_ => None,
	};

	let code = match topic {
		Topic::Status => data.get("code").and_then(|c| c.as_str()).map(str::to_string),
		_ => None,
	};

	Ok(TransactionEvent {
		topic,
		hash,
		height,
		code,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::StreamExt;
	use tokio::net::TcpListener;
	use tokio_tungstenite::accept_async;

	const HASH: &str = "3A1B9F8A5C4E2D7B6A0F1E2D3C4B5A69788796A5B4C3D2E1F00112233445566A";
	const ADDRESS: &str = "TBIL6D6RURP45YQRWV6Q7YVWIIPLQGLZQFHWFEQ";

	#[test]
	fn test_decode_confirmed_event() {
		let data = serde_json::json!({
			"transaction": { "type": 16724 },
			"meta": { "hash": HASH, "height": "1200", "merkleComponentHash": HASH }
		});
		let event = decode_event(Topic::ConfirmedAdded, &data).unwrap();
		assert_eq!(event.hash.to_string(), HASH);
		assert_eq!(event.height, Some(1200));
		assert_eq!(event.code, None);
	}

	#[test]
	fn test_decode_status_event() {
		let data = serde_json::json!({
			"hash": HASH,
			"code": "Failure_Core_Insufficient_Balance",
			"deadline": "123"
		});
		let event = decode_event(Topic::Status, &data).unwrap();
		assert_eq!(event.code.as_deref(), Some("Failure_Core_Insufficient_Balance"));
		assert_eq!(event.height, None);
	}

	#[test]
	fn test_decode_rejects_missing_hash() {
		assert!(decode_event(Topic::UnconfirmedAdded, &serde_json::json!({ "meta": {} })).is_err());
		assert!(decode_event(Topic::ConfirmedAdded, &serde_json::json!({})).is_err());
	}

	fn text(value: serde_json::Value) -> Message {
		Message::Text(value.to_string().into())
	}

	async fn next_json<S>(ws: &mut S) -> serde_json::Value
	where
		S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
	{
		loop {
			match ws.next().await.unwrap().unwrap() {
				Message::Text(text) => return serde_json::from_str(&text).unwrap(),
				_ => continue,
			}
		}
	}

	#[tokio::test]
	async fn test_subscribe_route_and_unsubscribe() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let channel = format!("confirmedAdded/{}", ADDRESS);

		let server_channel = channel.clone();
		let server = tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let mut ws = accept_async(stream).await.unwrap();
			ws.send(text(serde_json::json!({ "uid": "test-uid" }))).await.unwrap();

			let subscribe = next_json(&mut ws).await;
			assert_eq!(subscribe["uid"], "test-uid");
			assert_eq!(subscribe["subscribe"], server_channel.as_str());

			// Unrelated channel first, then the subscribed one twice
			ws.send(text(serde_json::json!({
				"topic": format!("unconfirmedAdded/{}", ADDRESS),
				"data": { "meta": { "hash": HASH } }
			})))
			.await
			.unwrap();
			for _ in 0..2 {
				ws.send(text(serde_json::json!({
					"topic": server_channel,
					"data": { "meta": { "hash": HASH, "height": "77" } }
				})))
				.await
				.unwrap();
			}

			let unsubscribe = next_json(&mut ws).await;
			assert_eq!(unsubscribe["unsubscribe"], server_channel.as_str());
		});

		let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
		let feed = WsNotificationChannel::connect(&url).await.unwrap();
		assert_eq!(feed.uid(), "test-uid");

		let account: AccountAddress = ADDRESS.parse().unwrap();
		let mut events = feed.subscribe(&account, Topic::ConfirmedAdded).await.unwrap();

		let first = events.next().await.unwrap().unwrap();
		assert_eq!(first.topic, Topic::ConfirmedAdded);
		assert_eq!(first.height, Some(77));
		let second = events.next().await.unwrap().unwrap();
		assert_eq!(second, first);

		drop(events);
		server.await.unwrap();
		feed.close().await;
	}

	#[tokio::test]
	async fn test_node_close_fails_subscribers() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let mut ws = accept_async(stream).await.unwrap();
			ws.send(text(serde_json::json!({ "uid": "closing" }))).await.unwrap();
			let _ = next_json(&mut ws).await;
			ws.close(None).await.unwrap();
		});

		let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
		let feed = WsNotificationChannel::connect(&url).await.unwrap();
		let account: AccountAddress = ADDRESS.parse().unwrap();
		let mut events = feed.subscribe(&account, Topic::Status).await.unwrap();

		let result = events.next().await.unwrap();
		assert_eq!(result, Err(ChannelError::Closed));
		assert!(events.next().await.is_none());
	}

	#[tokio::test]
	async fn test_connect_refused() {
		let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
		let result = WsNotificationChannel::connect(&url).await;
		assert!(matches!(result, Err(ChannelError::Connect(_))));
	}
}
