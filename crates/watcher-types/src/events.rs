//! Push notification types.
//!
//! A node's event feed is organised in channels named `{topic}/{address}`.
//! Subscribers receive one [`TransactionEvent`] per transaction the node
//! processes for that account.

use crate::errors::ChannelError;
use crate::hash::TransactionHash;
use crate::status::{StatusGroup, TransactionStatus, SUCCESS};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

/// Account identifier used to key notification channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress(String);

impl AccountAddress {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl FromStr for AccountAddress {
	type Err = String;

	/// Accepts the dashed display form and normalises to upper case.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized: String = s
			.trim()
			.chars()
			.filter(|c| *c != '-')
			.map(|c| c.to_ascii_uppercase())
			.collect();

		if normalized.is_empty() {
			return Err("account address is empty".to_string());
		}
		if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(format!("invalid account address: {}", s));
		}

		Ok(Self(normalized))
	}
}

impl fmt::Display for AccountAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Event feed topics understood by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
	#[serde(rename = "confirmedAdded")]
	ConfirmedAdded,
	#[serde(rename = "unconfirmedAdded")]
	UnconfirmedAdded,
	#[serde(rename = "partialAdded")]
	PartialAdded,
	/// Validation failures for transactions signed by the account.
	#[serde(rename = "status")]
	Status,
}

impl Topic {
	pub fn as_str(&self) -> &'static str {
		match self {
			Topic::ConfirmedAdded => "confirmedAdded",
			Topic::UnconfirmedAdded => "unconfirmedAdded",
			Topic::PartialAdded => "partialAdded",
			Topic::Status => "status",
		}
	}

	/// Wire channel name for this topic and account.
	pub fn channel(&self, account: &AccountAddress) -> String {
		format!("{}/{}", self.as_str(), account)
	}

	/// Topic whose events signal that a transaction entered `group`.
	pub fn for_target(group: StatusGroup) -> Option<Topic> {
		match group {
			StatusGroup::Confirmed => Some(Topic::ConfirmedAdded),
			StatusGroup::Unconfirmed => Some(Topic::UnconfirmedAdded),
			StatusGroup::Partial => Some(Topic::PartialAdded),
			StatusGroup::Failed => Some(Topic::Status),
		}
	}

	/// Splits a wire channel name back into topic and address.
	pub fn parse_channel(channel: &str) -> Option<(Topic, AccountAddress)> {
		let (topic, address) = channel.split_once('/')?;
		let topic = topic.parse().ok()?;
		let address = address.parse().ok()?;
		Some((topic, address))
	}
}

impl fmt::Display for Topic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Topic {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"confirmedAdded" => Ok(Topic::ConfirmedAdded),
			"unconfirmedAdded" => Ok(Topic::UnconfirmedAdded),
			"partialAdded" => Ok(Topic::PartialAdded),
			"status" => Ok(Topic::Status),
			other => Err(format!("unsupported topic: {}", other)),
		}
	}
}

/// A transaction observed on a notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
	pub topic: Topic,
	pub hash: TransactionHash,
	/// Block height, set for confirmed events.
	pub height: Option<u64>,
	/// Failure code, set for status events.
	pub code: Option<String>,
}

impl TransactionEvent {
	/// Status equivalent of this event, as the REST API would report it.
	pub fn status(&self) -> TransactionStatus {
		let (group, default_code) = match self.topic {
			Topic::ConfirmedAdded => (StatusGroup::Confirmed, SUCCESS),
			Topic::UnconfirmedAdded => (StatusGroup::Unconfirmed, SUCCESS),
			Topic::PartialAdded => (StatusGroup::Partial, SUCCESS),
			Topic::Status => (StatusGroup::Failed, "Failure"),
		};

		TransactionStatus {
			group,
			code: self.code.clone().unwrap_or_else(|| default_code.to_string()),
			hash: Some(self.hash),
			height: self.height,
			deadline: None,
		}
	}
}

/// Stream of events delivered by a subscription.
///
/// Dropping the stream ends the subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<TransactionEvent, ChannelError>> + Send>>;
