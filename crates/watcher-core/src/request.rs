//! Watch inputs and outcomes.

use crate::error::WatchError;
use std::time::Duration;
use watcher_config::WatchSettings;
use watcher_types::{StatusGroup, TransactionHash, TransactionStatus};

/// What to watch for and how long to keep asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
	pub hash: TransactionHash,
	/// Group the caller is waiting to observe.
	pub target: StatusGroup,
	/// Delay before each status query.
	pub interval: Duration,
	/// Upper bound on status queries.
	pub max_attempts: u32,
}

impl WatchRequest {
	pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

	pub fn new(hash: TransactionHash, target: StatusGroup) -> Self {
		Self {
			hash,
			target,
			interval: Self::DEFAULT_INTERVAL,
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
		}
	}

	pub fn from_settings(hash: TransactionHash, settings: &WatchSettings) -> Self {
		Self {
			hash,
			target: settings.target,
			interval: settings.interval(),
			max_attempts: settings.max_attempts,
		}
	}

	pub fn with_target(mut self, target: StatusGroup) -> Self {
		self.target = target;
		self
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;
		self
	}

	/// Bounds the watch by wall-clock time instead of a query count.
	///
	/// The deadline is converted into the number of intervals that fit in
	/// it, rounded up, and never less than one.
	pub fn with_deadline(mut self, deadline: Duration) -> Self {
		let interval = self.interval.as_nanos().max(1);
		let attempts = deadline.as_nanos().div_ceil(interval).max(1);
		self.max_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
		self
	}

	/// Total time the watch may spend sleeping between queries.
	pub fn budget(&self) -> Duration {
		self.interval.saturating_mul(self.max_attempts)
	}

	pub fn validate(&self) -> Result<(), WatchError> {
		if !self.target.is_watchable() {
			return Err(WatchError::InvalidRequest(format!(
				"cannot wait for the '{}' group",
				self.target
			)));
		}
		if self.interval.is_zero() {
			return Err(WatchError::InvalidRequest(
				"poll interval must be positive".to_string(),
			));
		}
		if self.max_attempts == 0 {
			return Err(WatchError::InvalidRequest(
				"max_attempts must be positive".to_string(),
			));
		}
		Ok(())
	}
}

/// Terminal result of a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
	/// The transaction reached the target group.
	Reached(TransactionStatus),
	/// The node reported the transaction as failed.
	Failed(TransactionStatus),
	/// The attempt budget ran out first.
	TimedOut,
}

impl WatchOutcome {
	pub fn is_reached(&self) -> bool {
		matches!(self, WatchOutcome::Reached(_))
	}

	/// Converts failure and timeout into errors for `?` propagation.
	pub fn into_result(self) -> Result<TransactionStatus, WatchError> {
		match self {
			WatchOutcome::Reached(status) => Ok(status),
			WatchOutcome::Failed(status) => Err(WatchError::Failed(status)),
			WatchOutcome::TimedOut => Err(WatchError::TimedOut),
		}
	}
}
