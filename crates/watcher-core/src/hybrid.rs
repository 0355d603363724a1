//! Races polling against push notifications.

use crate::error::WatchError;
use crate::events::EventWatcher;
use crate::request::{WatchOutcome, WatchRequest};
use crate::watcher::TransactionWatcher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watcher_types::AccountAddress;

/// Watches a transaction through both the REST poller and the event feed.
///
/// Whichever path reaches a terminal status first decides the outcome and
/// the other path is dropped. An error on one path is logged and the other
/// keeps running; the first error is returned only when neither path can
/// resolve the watch.
#[derive(Clone)]
pub struct HybridWatcher {
	poller: TransactionWatcher,
	events: EventWatcher,
}

impl HybridWatcher {
	pub fn new(poller: TransactionWatcher, events: EventWatcher) -> Self {
		Self { poller, events }
	}

	pub async fn watch(
		&self,
		account: &AccountAddress,
		request: &WatchRequest,
		token: &CancellationToken,
	) -> Result<WatchOutcome, WatchError> {
		request.validate()?;

		let poll = self.poller.watch_until_cancelled(request, token);
		let push = self.events.wait_until_cancelled(account, request, token);
		tokio::pin!(poll);
		tokio::pin!(push);

		let mut poll_active = true;
		let mut push_active = true;
		let mut first_error: Option<WatchError> = None;

		while poll_active || push_active {
			let (path, result) = tokio::select! {
				result = &mut poll, if poll_active => {
					poll_active = false;
					("poll", result)
				}
				result = &mut push, if push_active => {
					push_active = false;
					("push", result)
				}
			};

			match result {
				Ok(WatchOutcome::TimedOut) => {}
				Ok(outcome) => {
					info!(tx_hash = %request.hash.short(), path, "Watch resolved");
					return Ok(outcome);
				}
				Err(WatchError::Cancelled) => return Err(WatchError::Cancelled),
				Err(e) => {
					warn!(tx_hash = %request.hash.short(), path, "Watch path failed: {}", e);
					first_error.get_or_insert(e);
				}
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(WatchOutcome::TimedOut),
		}
	}
}
