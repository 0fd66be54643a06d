//! The persisted player record and its history types.
//!
//! A [`PlayerRecord`] is the single durable unit of player state: balance,
//! bounded inventory, a short sliding window of chat messages used as LLM
//! context, and an unbounded audit log of every applied change.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Balance assigned to a player on first contact.
pub const STARTING_BALANCE: i64 = 1000;

/// Soft cap on the sum of all item quantities in an inventory.
///
/// Enforced only when a change is applied, never retroactively.
pub const INVENTORY_CAPACITY: u32 = 20;

/// Number of chat messages kept in [`PlayerRecord::message_history`].
pub const MESSAGE_HISTORY_LIMIT: usize = 5;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The player.
    User,
    /// The model (game master).
    Assistant,
}

impl Role {
    /// Wire name of the role, as used by chat completion APIs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who is speaking.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatTurn {
    /// A system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant-role message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A remembered chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl HistoryMessage {
    /// Project the message into a turn for the completion endpoint.
    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// One entry of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ActionRecord {
    /// A narrated action changed balance or inventory.
    Action {
        /// The player's input that triggered the change.
        action: String,
        /// Balance before the action.
        old_balance: i64,
        /// Balance after the action.
        new_balance: i64,
        /// Inventory deltas as emitted by the model, including rejected ones.
        inventory_changes: BTreeMap<String, i64>,
        /// When the change was applied.
        timestamp: DateTime<Utc>,
    },
    /// This player sent money or items to another player.
    TransferSent {
        /// The receiver.
        to: PlayerId,
        /// Money moved.
        money: u64,
        /// Items moved.
        items: BTreeMap<String, i64>,
        /// Note attached by the sender.
        message: String,
        /// When the transfer executed.
        timestamp: DateTime<Utc>,
    },
    /// This player received money or items from another player.
    TransferReceived {
        /// The sender.
        from: PlayerId,
        /// Money moved.
        money: u64,
        /// Items moved.
        items: BTreeMap<String, i64>,
        /// Note attached by the sender.
        message: String,
        /// When the transfer executed.
        timestamp: DateTime<Utc>,
    },
}

/// Persisted per-player state.
///
/// Optional fields carry serde defaults so that older or hand-edited files
/// load with the missing parts backfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Stable identity.
    pub id: PlayerId,
    /// Best-effort display name, may be empty.
    #[serde(default)]
    pub display_name: String,
    /// Best-effort platform handle (without `@`), may be empty.
    #[serde(default)]
    pub handle: String,
    /// Cash balance. No floor is enforced.
    #[serde(default = "starting_balance")]
    pub balance: i64,
    /// Item name to quantity. Every stored quantity is positive.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// The most recent chat messages, oldest first.
    #[serde(default)]
    pub message_history: Vec<HistoryMessage>,
    /// Every applied change, oldest first. Never pruned.
    #[serde(default)]
    pub action_history: Vec<ActionRecord>,
    /// Creation time. Set once.
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

const fn starting_balance() -> i64 {
    STARTING_BALANCE
}

impl PlayerRecord {
    /// A fresh player with the starting balance and empty state.
    pub fn new(
        id: PlayerId,
        display_name: impl Into<String>,
        handle: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            handle: handle.into(),
            balance: STARTING_BALANCE,
            inventory: BTreeMap::new(),
            message_history: Vec::new(),
            action_history: Vec::new(),
            registered_at,
        }
    }

    /// Sum of all item quantities.
    pub fn inventory_count(&self) -> u32 {
        inventory_count(&self.inventory)
    }

    /// Append a chat message and trim the window to [`MESSAGE_HISTORY_LIMIT`].
    pub fn remember(&mut self, role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) {
        self.message_history.push(HistoryMessage {
            role,
            content: content.into(),
            timestamp,
        });
        let excess = self
            .message_history
            .len()
            .saturating_sub(MESSAGE_HISTORY_LIMIT);
        if excess > 0 {
            self.message_history.drain(..excess);
        }
    }

    /// The last `n` remembered messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> &[HistoryMessage] {
        let start = self.message_history.len().saturating_sub(n);
        self.message_history.get(start..).unwrap_or_default()
    }

    /// Name to show to other players: `@handle` if known, else the display name.
    pub fn public_name(&self) -> String {
        if self.handle.is_empty() {
            self.display_name.clone()
        } else {
            format!("@{}", self.handle)
        }
    }
}

/// Sum of all quantities in an inventory, saturating at `u32::MAX`.
pub fn inventory_count(inventory: &BTreeMap<String, u32>) -> u32 {
    inventory
        .values()
        .fold(0_u32, |total, qty| total.saturating_add(*qty))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn player() -> PlayerRecord {
        PlayerRecord::new(PlayerId(1), "Alice", "alice", Utc::now())
    }

    #[test]
    fn new_player_has_starting_balance_and_empty_state() {
        let p = player();
        assert_eq!(p.balance, STARTING_BALANCE);
        assert!(p.inventory.is_empty());
        assert!(p.message_history.is_empty());
        assert!(p.action_history.is_empty());
    }

    #[test]
    fn remember_keeps_only_the_latest_messages() {
        let mut p = player();
        for i in 0..8 {
            p.remember(Role::User, format!("msg {i}"), Utc::now());
        }
        assert_eq!(p.message_history.len(), MESSAGE_HISTORY_LIMIT);
        assert_eq!(p.message_history.first().unwrap().content, "msg 3");
        assert_eq!(p.message_history.last().unwrap().content, "msg 7");
    }

    #[test]
    fn recent_messages_is_bounded_by_history_length() {
        let mut p = player();
        p.remember(Role::User, "one", Utc::now());
        assert_eq!(p.recent_messages(3).len(), 1);
        p.remember(Role::Assistant, "two", Utc::now());
        p.remember(Role::User, "three", Utc::now());
        p.remember(Role::Assistant, "four", Utc::now());
        let recent = p.recent_messages(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.first().unwrap().content, "two");
    }

    #[test]
    fn inventory_count_sums_quantities() {
        let mut p = player();
        p.inventory.insert("apple".to_owned(), 2);
        p.inventory.insert("bread".to_owned(), 5);
        assert_eq!(p.inventory_count(), 7);
    }

    #[test]
    fn missing_optional_fields_are_backfilled() {
        let json = r#"{"id": 77, "balance": 12}"#;
        let p: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, PlayerId(77));
        assert_eq!(p.balance, 12);
        assert!(p.display_name.is_empty());
        assert!(p.inventory.is_empty());
        assert!(p.message_history.is_empty());
    }

    #[test]
    fn missing_balance_defaults_to_starting_balance() {
        let p: PlayerRecord = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(p.balance, STARTING_BALANCE);
    }

    #[test]
    fn record_uses_camel_case_field_names() {
        let value = serde_json::to_value(player()).unwrap();
        assert!(value.get("displayName").is_some());
        assert!(value.get("messageHistory").is_some());
        assert!(value.get("actionHistory").is_some());
        assert!(value.get("registeredAt").is_some());
    }

    #[test]
    fn audit_entries_are_tagged_by_type() {
        let entry = ActionRecord::TransferSent {
            to: PlayerId(2),
            money: 100,
            items: BTreeMap::from([("apple".to_owned(), 1)]),
            message: "hi".to_owned(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value.get("type").and_then(serde_json::Value::as_str), Some("transfer_sent"));
        assert_eq!(value.get("to").and_then(serde_json::Value::as_i64), Some(2));
    }

    #[test]
    fn public_name_prefers_handle() {
        let mut p = player();
        assert_eq!(p.public_name(), "@alice");
        p.handle.clear();
        assert_eq!(p.public_name(), "Alice");
    }
}
