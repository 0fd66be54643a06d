//! Type-safe identifiers for players and transfers.
//!
//! Player ids come from the chat platform and are plain signed integers.
//! Transfer ids are composed from both participants and a timestamp, so
//! their uniqueness is only as strong as the clock's resolution.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of a player, as assigned by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl PlayerId {
    /// Wrap a raw platform id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Return the inner integer value.
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PlayerId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for PlayerId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Identifier of a pending transfer.
///
/// Rendered as `{sender}_{receiver}_{micros}` where `micros` is the
/// creation time in microseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    /// Compose a transfer id from its participants and creation time.
    pub fn generate(sender: PlayerId, receiver: PlayerId, at: DateTime<Utc>) -> Self {
        Self(format!("{sender}_{receiver}_{}", at.timestamp_micros()))
    }

    /// Borrow the textual form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TransferId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for TransferId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}
