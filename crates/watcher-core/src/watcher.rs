//! Polling transaction watcher.
//!
//! The watcher sleeps one interval, asks the status source about the hash,
//! and repeats until the transaction reaches the target group, fails, or the
//! attempt budget is spent. A node that has not indexed the hash yet answers
//! "not found"; that is treated as "no information yet" and costs an attempt
//! like any other non-terminal answer. A source that cannot be reached at
//! all ends the watch immediately with [`WatchError::Transport`] so outages
//! are not mistaken for slow confirmation.

use crate::error::WatchError;
use crate::request::{WatchOutcome, WatchRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use watcher_types::{StatusGroup, StatusLookup, StatusSource};

/// Polls a [`StatusSource`] until a watch resolves.
///
/// The watcher holds no per-transaction state, so one instance can serve
/// any number of concurrent watches.
#[derive(Clone)]
pub struct TransactionWatcher {
	source: Arc<dyn StatusSource>,
}

impl TransactionWatcher {
	pub fn new(source: Arc<dyn StatusSource>) -> Self {
		Self { source }
	}

	/// Runs a watch to completion.
	pub async fn watch(&self, request: &WatchRequest) -> Result<WatchOutcome, WatchError> {
		self.watch_until_cancelled(request, &CancellationToken::new())
			.await
	}

	/// Runs a watch that ends early with [`WatchError::Cancelled`] once
	/// `token` is cancelled.
	///
	/// Cancellation is observed while sleeping and while a query is in
	/// flight; an in-flight query is dropped rather than awaited.
	pub async fn watch_until_cancelled(
		&self,
		request: &WatchRequest,
		token: &CancellationToken,
	) -> Result<WatchOutcome, WatchError> {
		request.validate()?;

		info!(
			tx_hash = %request.hash.short(),
			target = %request.target,
			max_attempts = request.max_attempts,
			"Waiting for transaction status"
		);

		for attempt in 1..=request.max_attempts {
			tokio::select! {
				biased;
				_ = token.cancelled() => return Err(WatchError::Cancelled),
				_ = tokio::time::sleep(request.interval) => {}
			}

			let lookup = tokio::select! {
				biased;
				_ = token.cancelled() => return Err(WatchError::Cancelled),
				result = self.source.query(&request.hash) => result,
			};

			let lookup = match lookup {
				Ok(lookup) => lookup,
				Err(e) => {
					error!(
						tx_hash = %request.hash.short(),
						attempt,
						"Status query failed: {}",
						e
					);
					return Err(WatchError::Transport(e));
				}
			};

			match evaluate(lookup, request.target) {
				Some(outcome) => {
					log_outcome(request, attempt, &outcome);
					return Ok(outcome);
				}
				None => {
					debug!(
						tx_hash = %request.hash.short(),
						attempt,
						"Target status not reached yet"
					);
				}
			}
		}

		warn!(
			tx_hash = %request.hash.short(),
			target = %request.target,
			"Transaction status not reached after {} attempts",
			request.max_attempts
		);
		Ok(WatchOutcome::TimedOut)
	}
}

/// Decides whether one lookup ends the watch.
pub(crate) fn evaluate(lookup: StatusLookup, target: StatusGroup) -> Option<WatchOutcome> {
	match lookup {
		StatusLookup::NotFound => None,
		StatusLookup::Found(status) if status.group == target => Some(WatchOutcome::Reached(status)),
		StatusLookup::Found(status) if status.group == StatusGroup::Failed => {
			Some(WatchOutcome::Failed(status))
		}
		StatusLookup::Found(_) => None,
	}
}

fn log_outcome(request: &WatchRequest, attempt: u32, outcome: &WatchOutcome) {
	match outcome {
		WatchOutcome::Reached(status) => info!(
			tx_hash = %request.hash.short(),
			group = %status.group,
			code = %status.code,
			attempt,
			"Transaction reached target status"
		),
		WatchOutcome::Failed(status) => warn!(
			tx_hash = %request.hash.short(),
			code = %status.code,
			attempt,
			"Transaction failed"
		),
		WatchOutcome::TimedOut => {}
	}
}
