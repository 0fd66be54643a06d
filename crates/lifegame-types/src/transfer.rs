//! The ephemeral pending-transfer type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// An unconfirmed peer-to-peer exchange awaiting the receiver's decision.
///
/// Lives only in process memory between validation and resolution; a
/// restart silently drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Who is giving.
    pub sender_id: PlayerId,
    /// Sender's display name at creation time.
    pub sender_name: String,
    /// Who must accept or reject.
    pub receiver_id: PlayerId,
    /// Money to move from sender to receiver.
    pub money: u64,
    /// Item name to quantity to move.
    pub items: BTreeMap<String, i64>,
    /// Note attached by the sender, may be empty.
    pub message: String,
    /// When the transfer was staged.
    pub created_at: DateTime<Utc>,
}
