// watcher-core/src/error.rs

use thiserror::Error;
use watcher_types::{ChannelError, SourceError, TransactionStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
	#[error("Transport error: {0}")]
	Transport(#[from] SourceError),

	#[error("Notification channel error: {0}")]
	Channel(#[from] ChannelError),

	#[error("Invalid watch request: {0}")]
	InvalidRequest(String),

	#[error("Watch cancelled")]
	Cancelled,

	#[error("Transaction failed with code {}", .0.code)]
	Failed(TransactionStatus),

	#[error("Transaction status not reached before the attempt budget ran out")]
	TimedOut,

	#[error("Node rejected transaction: {message}")]
	Rejected {
		code: Option<String>,
		message: String,
	},
}
