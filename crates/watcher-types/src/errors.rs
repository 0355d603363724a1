//! Error types returned by the watcher's collaborators.

use thiserror::Error;

/// Failure to complete a request against a status source or submitter.
///
/// These are infrastructural: the node could not be asked, or answered in a
/// way that carries no status information. A semantic "not found" is never
/// reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
	#[error("Transport error: {0}")]
	Transport(String),

	#[error("Unexpected response (HTTP {status}): {body}")]
	UnexpectedResponse { status: u16, body: String },

	#[error("Decode error: {0}")]
	Decode(String),
}

/// Failure on a push notification channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
	#[error("Connection error: {0}")]
	Connect(String),

	#[error("Channel closed")]
	Closed,

	#[error("Protocol error: {0}")]
	Protocol(String),
}
