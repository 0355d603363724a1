//! Collaborator traits the watcher is built against.

use crate::errors::{ChannelError, SourceError};
use crate::events::{AccountAddress, EventStream, Topic};
use crate::hash::TransactionHash;
use crate::status::StatusLookup;
use crate::submission::{SignedPayload, SubmissionAck};
use async_trait::async_trait;

/// Read-only view of a node's knowledge about transactions.
///
/// Implementations must be safe to share between concurrent watches.
#[async_trait]
pub trait StatusSource: Send + Sync {
	/// Returns the current status of `hash`, or `NotFound` if the node has
	/// not indexed it yet.
	async fn query(&self, hash: &TransactionHash) -> Result<StatusLookup, SourceError>;
}

/// Announces signed transactions to the network.
#[async_trait]
pub trait Submitter: Send + Sync {
	async fn submit(&self, payload: &SignedPayload) -> Result<SubmissionAck, SourceError>;
}

/// Push-based feed of transaction events.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
	/// Subscribes to `topic` for `account`. Dropping the returned stream
	/// unsubscribes.
	async fn subscribe(
		&self,
		account: &AccountAddress,
		topic: Topic,
	) -> Result<EventStream, ChannelError>;
}
