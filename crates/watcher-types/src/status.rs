//! Transaction status types as reported by a node.

use crate::hash::TransactionHash;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Code the node uses when it has no record of a hash yet.
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFound";

/// Code attached to a successfully processed transaction.
pub const SUCCESS: &str = "Success";

/// Coarse lifecycle stage of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusGroup {
	/// Accepted into a node's unconfirmed pool.
	Unconfirmed,
	/// Aggregate waiting for cosignatures.
	Partial,
	/// Included in a block.
	Confirmed,
	/// Rejected during validation or execution.
	Failed,
}

impl StatusGroup {
	pub fn as_str(&self) -> &'static str {
		match self {
			StatusGroup::Unconfirmed => "unconfirmed",
			StatusGroup::Partial => "partial",
			StatusGroup::Confirmed => "confirmed",
			StatusGroup::Failed => "failed",
		}
	}

	/// Whether a watch may wait for this group.
	///
	/// `failed` is always terminal and never a target.
	pub fn is_watchable(&self) -> bool {
		!matches!(self, StatusGroup::Failed)
	}
}

impl fmt::Display for StatusGroup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for StatusGroup {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"unconfirmed" => Ok(StatusGroup::Unconfirmed),
			"partial" => Ok(StatusGroup::Partial),
			"confirmed" => Ok(StatusGroup::Confirmed),
			"failed" => Ok(StatusGroup::Failed),
			other => Err(format!("unknown status group: {}", other)),
		}
	}
}

/// Snapshot of what a node knows about one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
	pub group: StatusGroup,
	pub code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<TransactionHash>,
	/// Block height, present once the transaction is confirmed.
	#[serde(
		default,
		deserialize_with = "deserialize_u64_opt",
		skip_serializing_if = "Option::is_none"
	)]
	pub height: Option<u64>,
	#[serde(
		default,
		deserialize_with = "deserialize_u64_opt",
		skip_serializing_if = "Option::is_none"
	)]
	pub deadline: Option<u64>,
}

impl TransactionStatus {
	pub fn new(group: StatusGroup, code: impl Into<String>) -> Self {
		Self {
			group,
			code: code.into(),
			hash: None,
			height: None,
			deadline: None,
		}
	}

	pub fn with_hash(mut self, hash: TransactionHash) -> Self {
		self.hash = Some(hash);
		self
	}

	pub fn with_height(mut self, height: u64) -> Self {
		self.height = Some(height);
		self
	}

	pub fn is_success(&self) -> bool {
		self.code == SUCCESS
	}
}

/// Result of asking a status source about a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLookup {
	Found(TransactionStatus),
	/// The node has not indexed the hash yet.
	NotFound,
}

impl StatusLookup {
	pub fn found(&self) -> Option<&TransactionStatus> {
		match self {
			StatusLookup::Found(status) => Some(status),
			StatusLookup::NotFound => None,
		}
	}
}

/// The node encodes 64-bit integers as decimal strings; accept both forms.
fn deserialize_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(u64),
		Text(String),
	}

	match Option::<Raw>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Raw::Number(n)) => Ok(Some(n)),
		Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
	}
}
