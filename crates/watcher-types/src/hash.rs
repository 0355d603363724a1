//! Transaction hash representation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a transaction hash in bytes.
pub const HASH_LENGTH: usize = 32;

/// Content-derived identifier of a submitted transaction.
///
/// Hashes are produced by the signing step outside this workspace and are
/// only ever read here. They print as upper-case hex, which is the form the
/// node's REST API and explorers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub [u8; HASH_LENGTH]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashParseError {
	#[error("transaction hash is empty")]
	Empty,

	#[error("invalid hex in transaction hash: {0}")]
	InvalidHex(String),

	#[error("transaction hash must be 32 bytes, got {0}")]
	InvalidLength(usize),
}

impl TransactionHash {
	pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
		&self.0
	}

	/// Abbreviated form for log lines.
	pub fn short(&self) -> String {
		let encoded = hex::encode_upper(&self.0[..4]);
		format!("{}..", encoded)
	}
}

impl From<[u8; HASH_LENGTH]> for TransactionHash {
	fn from(bytes: [u8; HASH_LENGTH]) -> Self {
		Self(bytes)
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode_upper(self.0))
	}
}

impl FromStr for TransactionHash {
	type Err = HashParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let hex_str = trimmed
			.strip_prefix("0x")
			.or_else(|| trimmed.strip_prefix("0X"))
			.unwrap_or(trimmed);
		if hex_str.is_empty() {
			return Err(HashParseError::Empty);
		}

		let bytes = hex::decode(hex_str).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
		let bytes: [u8; HASH_LENGTH] = bytes
			.as_slice()
			.try_into()
			.map_err(|_| HashParseError::InvalidLength(bytes.len()))?;

		Ok(Self(bytes))
	}
}

impl Serialize for TransactionHash {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for TransactionHash {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}
