//! Types exchanged with a transaction submitter.

use crate::hash::TransactionHash;
use serde::{Deserialize, Serialize};

/// A signed transaction ready to announce.
///
/// `payload` is the hex-encoded serialized transaction produced by the
/// signing SDK. `hash` is computed by that same step and is what the
/// watcher follows afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
	pub payload: String,
	pub hash: TransactionHash,
}

impl SignedPayload {
	pub fn new(payload: impl Into<String>, hash: TransactionHash) -> Self {
		Self {
			payload: payload.into(),
			hash,
		}
	}
}

/// Immediate answer from a node to an announce request.
///
/// Acceptance only means the node took the payload; finality is known only
/// by watching the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
	pub accepted: bool,
	/// Node error code, set on rejection.
	pub code: Option<String>,
	pub message: String,
}

impl SubmissionAck {
	pub fn accepted(message: impl Into<String>) -> Self {
		Self {
			accepted: true,
			code: None,
			message: message.into(),
		}
	}

	pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			accepted: false,
			code: Some(code.into()),
			message: message.into(),
		}
	}
}
