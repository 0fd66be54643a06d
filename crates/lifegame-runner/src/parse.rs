//! Reply parsers for the three prompt kinds.
//!
//! Parsing is best-effort: a missing or malformed tag silently falls back
//! to its default, and nothing here ever fails. Malformed tags are logged
//! at `debug!` so prompt authors can spot them.

use std::collections::BTreeMap;

use lifegame_types::PlayerId;
use tracing::debug;

use crate::llm::is_error_text;
use crate::tags::{self, Tag};

/// Shown when the completion came back empty.
pub const EMPTY_REPLY: &str = "Something went wrong";

/// Shown when stripping markup leaves nothing to display.
pub const FALLBACK_REPLY: &str = "Could not process the reply";

/// Reason used when a validation reply carries no `<reason=...>` tag.
pub const UNKNOWN_REASON: &str = "Unknown error";

/// A narrated action reply, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReply {
    /// Prose with all markup removed.
    pub display_text: String,
    /// The new absolute balance, if the model set one.
    pub balance: Tag<i64>,
    /// Signed quantity change per item name.
    pub inventory: BTreeMap<String, i64>,
}

impl ActionReply {
    /// The balance directive, if well-formed.
    pub fn balance_directive(&self) -> Option<i64> {
        self.balance.clone().present()
    }
}

/// Decode an action reply.
///
/// An empty reply or a client error string is passed through as the
/// display text with no directives.
pub fn parse_action_reply(raw: &str) -> ActionReply {
    if raw.is_empty() || is_error_text(raw) {
        return ActionReply {
            display_text: if raw.is_empty() {
                EMPTY_REPLY.to_owned()
            } else {
                raw.to_owned()
            },
            balance: Tag::Absent,
            inventory: BTreeMap::new(),
        };
    }

    let found = tags::scan(raw);
    let balance = tags::first(&found, "balance", tags::signed_int);
    if let Tag::Malformed(value) = &balance {
        debug!(value = value.as_str(), "ignoring malformed balance tag");
    }
    let (inventory, malformed) = tags::inventory_deltas(&found);
    if !malformed.is_empty() {
        debug!(tags = ?malformed, "ignoring malformed inventory tags");
    }

    let stripped = tags::strip_markup(raw);
    ActionReply {
        display_text: if stripped.is_empty() {
            FALLBACK_REPLY.to_owned()
        } else {
            stripped
        },
        balance,
        inventory,
    }
}

/// A transfer command, as understood by the model.
///
/// Values are not sanity-checked here: quantities may be negative and the
/// receiver may be the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    /// Money to move.
    pub money: u64,
    /// Item name to quantity.
    pub items: BTreeMap<String, i64>,
    /// Who should receive, if the model found an id.
    pub receiver_id: Option<PlayerId>,
    /// Note for the receiver.
    pub message: String,
}

/// Decode a transfer-parse reply.
///
/// Expected tags: `<money=N>`, `<items=NAME:QTY,...>`, `<receiver_id=ID>`,
/// `<message=TEXT>`. Each is looked up independently; a missing one
/// becomes 0, an empty map, `None`, or an empty string.
pub fn parse_transfer_reply(raw: &str) -> TransferRequest {
    let found = tags::scan(raw);

    let money = tags::first(&found, "money", tags::unsigned_int).or(0);
    let receiver_id = tags::first(&found, "receiver_id", |v| {
        tags::unsigned_int(v).and_then(|id| i64::try_from(id).ok())
    })
    .present()
    .map(PlayerId::new);
    let message = tags::first(&found, "message", tags::any_text)
        .present()
        .unwrap_or_default();
    let items = tags::first(&found, "items", tags::non_empty)
        .present()
        .map(|list| parse_item_list(&list))
        .unwrap_or_default();

    TransferRequest {
        money,
        items,
        receiver_id,
        message,
    }
}

/// Decode `NAME:QTY,NAME:QTY`. Parts without `:` or with a non-integer
/// quantity are skipped.
fn parse_item_list(list: &str) -> BTreeMap<String, i64> {
    let mut items = BTreeMap::new();
    for part in list.split(',') {
        let Some((name, quantity)) = part.split_once(':') else {
            continue;
        };
        let name = name.trim();
        match quantity.trim().parse::<i64>() {
            Ok(quantity) if !name.is_empty() => {
                items.insert(name.to_owned(), quantity);
            }
            _ => debug!(part = part, "ignoring malformed item in transfer reply"),
        }
    }
    items
}

/// The model's verdict on a proposed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the transfer may proceed.
    pub is_valid: bool,
    /// Explanation, shown to the sender on rejection.
    pub reason: String,
}

/// Decode a validation reply. Fails closed: no `<valid=...>` tag means invalid.
pub fn parse_validation_reply(raw: &str) -> Validation {
    let found = tags::scan(raw);
    Validation {
        is_valid: tags::first(&found, "valid", tags::boolean).or(false),
        reason: tags::first(&found, "reason", tags::non_empty)
            .present()
            .unwrap_or_else(|| UNKNOWN_REASON.to_owned()),
    }
}
