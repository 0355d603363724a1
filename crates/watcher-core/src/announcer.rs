//! Announce a signed transaction and follow it to a terminal status.

use crate::error::WatchError;
use crate::request::{WatchOutcome, WatchRequest};
use crate::watcher::TransactionWatcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watcher_config::WatchSettings;
use watcher_types::{SignedPayload, StatusGroup, Submitter};

pub struct Announcer {
	submitter: Arc<dyn Submitter>,
	watcher: TransactionWatcher,
	settings: WatchSettings,
}

impl Announcer {
	pub fn new(
		submitter: Arc<dyn Submitter>,
		watcher: TransactionWatcher,
		settings: WatchSettings,
	) -> Self {
		Self {
			submitter,
			watcher,
			settings,
		}
	}

	/// Submits `payload` and watches its hash until it reaches `target`.
	///
	/// A node rejection ends with [`WatchError::Rejected`] and no status
	/// queries are made.
	pub async fn announce(
		&self,
		payload: &SignedPayload,
		target: StatusGroup,
		token: &CancellationToken,
	) -> Result<WatchOutcome, WatchError> {
		let request = WatchRequest::from_settings(payload.hash, &self.settings).with_target(target);
		request.validate()?;

		let ack = self.submitter.submit(payload).await?;
		if !ack.accepted {
			warn!(
				tx_hash = %payload.hash.short(),
				code = ack.code.as_deref().unwrap_or("unknown"),
				"Announcement rejected"
			);
			return Err(WatchError::Rejected {
				code: ack.code,
				message: ack.message,
			});
		}

		info!(tx_hash = %payload.hash.short(), "Announcement accepted: {}", ack.message);
		self.watcher.watch_until_cancelled(&request, token).await
	}
}
