//! Shared type definitions for the Lifegame chat economy.
//!
//! Every crate in the workspace speaks in these types: the persisted
//! [`PlayerRecord`], the role-tagged [`ChatTurn`] exchanged with the
//! completion endpoint, the append-only [`ActionRecord`] audit log, and the
//! ephemeral [`PendingTransfer`] awaiting a receiver's decision.
//!
//! # Economy constants
//!
//! | Constant | Value | Meaning |
//! |----------|-------|---------|
//! | [`STARTING_BALANCE`] | 1000 | Balance of a freshly created player |
//! | [`INVENTORY_CAPACITY`] | 20 | Soft cap on the sum of all item quantities |
//! | [`MESSAGE_HISTORY_LIMIT`] | 5 | Sliding window of remembered chat messages |

pub mod ids;
pub mod player;
pub mod transfer;

pub use ids::{PlayerId, TransferId};
pub use player::{
    ActionRecord, ChatTurn, HistoryMessage, INVENTORY_CAPACITY, MESSAGE_HISTORY_LIMIT,
    PlayerRecord, Role, STARTING_BALANCE, inventory_count,
};
pub use transfer::PendingTransfer;
