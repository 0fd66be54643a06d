//! Peer-to-peer transfers of money and items.
//!
//! ```text
//! Requested --validation fails--> Rejected (never stored)
//! Requested --validation passes--> Pending
//! Pending   --receiver accepts---> Executed
//! Pending   --receiver rejects---> Discarded
//! ```
//!
//! Pending transfers live in a [`PendingTransfers`] table owned by the
//! [`TransferDesk`]. Nothing expires; a restart drops every pending entry.
//! Removing an entry from the table is the only way to resolve it, so a
//! transfer executes at most once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifegame_store::PlayerStore;
use lifegame_types::{
    ActionRecord, ChatTurn, INVENTORY_CAPACITY, PendingTransfer, PlayerId, PlayerRecord, TransferId,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, TransferError};
use crate::llm::Completion;
use crate::parse::{TransferRequest, Validation, parse_transfer_reply, parse_validation_reply};
use crate::prompt::{PromptEngine, ValidationContext, describe_items};

/// Sender name used when the sender never told us theirs.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Process-local table of transfers awaiting the receiver's decision.
#[derive(Debug, Default)]
pub struct PendingTransfers {
    inner: Mutex<HashMap<TransferId, PendingTransfer>>,
}

impl PendingTransfers {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the pending transfer, if it is still pending.
    pub async fn get(&self, id: &TransferId) -> Option<PendingTransfer> {
        self.inner.lock().await.get(id).cloned()
    }

    /// Store a pending transfer, replacing any entry with the same id.
    pub async fn put(&self, id: TransferId, transfer: PendingTransfer) {
        self.inner.lock().await.insert(id, transfer);
    }

    /// Remove and return the entry. Only the first caller gets `Some`.
    pub async fn remove(&self, id: &TransferId) -> Option<PendingTransfer> {
        self.inner.lock().await.remove(id)
    }

    /// Number of pending transfers.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Creates, validates and resolves transfers.
pub struct TransferDesk<C> {
    completion: Arc<C>,
    prompts: Arc<PromptEngine>,
    store: Arc<PlayerStore>,
    pending: PendingTransfers,
    /// Held while a resolved transfer rewrites player records.
    execution: Mutex<()>,
}

impl<C: Completion> TransferDesk<C> {
    /// Create a desk with an empty pending table.
    pub fn new(completion: Arc<C>, prompts: Arc<PromptEngine>, store: Arc<PlayerStore>) -> Self {
        Self {
            completion,
            prompts,
            store,
            pending: PendingTransfers::new(),
            execution: Mutex::new(()),
        }
    }

    /// The table of transfers awaiting a decision.
    pub const fn pending(&self) -> &PendingTransfers {
        &self.pending
    }

    /// Ask the model to turn a free-text command into a transfer request.
    ///
    /// Values are not checked: quantities may be negative and the receiver
    /// may be the sender.
    pub async fn parse_command(&self, text: &str) -> Result<TransferRequest, RunnerError> {
        let messages = vec![
            ChatTurn::system(self.prompts.render_transfer_parse()?),
            ChatTurn::user(text),
        ];
        let raw = self.completion.complete(&messages).await;
        let request = parse_transfer_reply(&raw);
        debug!(
            money = request.money,
            items = request.items.len(),
            receiver_id = ?request.receiver_id,
            "transfer command parsed"
        );
        Ok(request)
    }

    /// Ask the model whether the transfer is possible given both players'
    /// current state.
    ///
    /// Fails closed: a reply without a verdict, or a prompt that cannot be
    /// rendered, counts as invalid.
    pub async fn validate(
        &self,
        sender_id: PlayerId,
        receiver_id: PlayerId,
        money: u64,
        items: &BTreeMap<String, i64>,
    ) -> Validation {
        let sender = self.store.load(sender_id, None, None).await;
        let receiver = self.store.load(receiver_id, None, None).await;
        let ctx = ValidationContext {
            sender_id: sender.id.into_inner(),
            sender_balance: sender.balance,
            sender_inventory: describe_items(&sender.inventory),
            receiver_id: receiver.id.into_inner(),
            receiver_balance: receiver.balance,
            receiver_inventory: describe_items(&receiver.inventory),
            receiver_count: receiver.inventory_count(),
            capacity: INVENTORY_CAPACITY,
            money,
            items: describe_items(items),
        };

        let prompt = match self.prompts.render_transfer_validate(&ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "validation prompt unavailable, refusing transfer");
                return Validation {
                    is_valid: false,
                    reason: e.to_string(),
                };
            }
        };
        let raw = self.completion.complete(&[ChatTurn::system(prompt)]).await;
        parse_validation_reply(&raw)
    }

    /// Validate and stage a transfer. Returns the id of the pending entry.
    ///
    /// A receiver who has never played is refused before the model is
    /// consulted. Whether the sender can afford the transfer is left to
    /// the validation step.
    pub async fn create(
        &self,
        sender_id: PlayerId,
        receiver_id: PlayerId,
        money: u64,
        items: BTreeMap<String, i64>,
        message: String,
    ) -> Result<TransferId, TransferError> {
        if self.store.find(receiver_id).await.is_none() {
            info!(sender_id = %sender_id, receiver_id = %receiver_id, "transfer to unknown player refused");
            return Err(TransferError::ReceiverNotFound(receiver_id));
        }

        let verdict = self.validate(sender_id, receiver_id, money, &items).await;
        if !verdict.is_valid {
            info!(
                sender_id = %sender_id,
                receiver_id = %receiver_id,
                reason = verdict.reason.as_str(),
                "transfer rejected by validation"
            );
            return Err(TransferError::Rejected {
                reason: verdict.reason,
            });
        }

        let sender = self.store.load(sender_id, None, None).await;
        let now = Utc::now();
        let id = TransferId::generate(sender_id, receiver_id, now);
        let transfer = PendingTransfer {
            sender_id,
            sender_name: if sender.display_name.is_empty() {
                UNKNOWN_SENDER.to_owned()
            } else {
                sender.display_name
            },
            receiver_id,
            money,
            items,
            message,
            created_at: now,
        };
        self.pending.put(id.clone(), transfer).await;
        info!(transfer_id = %id, money, "transfer pending");
        Ok(id)
    }

    /// Carry out a pending transfer and remove it from the table.
    ///
    /// The sender's balance may go negative. Both records are saved
    /// separately; if the second save fails the first is not undone.
    pub async fn execute(&self, id: &TransferId) -> Result<PendingTransfer, TransferError> {
        let _guard = self.execution.lock().await;
        let transfer = self.pending.remove(id).await.ok_or(TransferError::NotFound)?;
        let now = Utc::now();

        if transfer.sender_id == transfer.receiver_id {
            let mut record = self.store.load(transfer.sender_id, None, None).await;
            debit(&mut record, &transfer, now);
            credit(&mut record, &transfer, now);
            self.store.save(&record).await;
        } else {
            let mut sender = self.store.load(transfer.sender_id, None, None).await;
            let mut receiver = self.store.load(transfer.receiver_id, None, None).await;
            move_funds(&mut sender, &mut receiver, &transfer, now);
            self.store.save(&sender).await;
            self.store.save(&receiver).await;
        }

        info!(
            transfer_id = %id,
            sender_id = %transfer.sender_id,
            receiver_id = %transfer.receiver_id,
            money = transfer.money,
            "transfer executed"
        );
        Ok(transfer)
    }

    /// Drop a pending transfer without touching any record.
    ///
    /// Returns `None` if it was already gone.
    pub async fn discard(&self, id: &TransferId) -> Option<PendingTransfer> {
        let removed = self.pending.remove(id).await;
        if removed.is_some() {
            info!(transfer_id = %id, "transfer discarded");
        }
        removed
    }

    /// Execute the transfer on behalf of `actor`, who must be its receiver.
    pub async fn accept(
        &self,
        id: &TransferId,
        actor: PlayerId,
    ) -> Result<PendingTransfer, TransferError> {
        self.check_receiver(id, actor).await?;
        self.execute(id).await
    }

    /// Discard the transfer on behalf of `actor`, who must be its receiver.
    pub async fn reject(
        &self,
        id: &TransferId,
        actor: PlayerId,
    ) -> Result<PendingTransfer, TransferError> {
        self.check_receiver(id, actor).await?;
        self.discard(id).await.ok_or(TransferError::NotFound)
    }

    async fn check_receiver(&self, id: &TransferId, actor: PlayerId) -> Result<(), TransferError> {
        let transfer = self.pending.get(id).await.ok_or(TransferError::NotFound)?;
        if transfer.receiver_id == actor {
            Ok(())
        } else {
            warn!(transfer_id = %id, actor = %actor, "transfer resolution by non-receiver refused");
            Err(TransferError::NotReceiver)
        }
    }
}

/// Move money and items from `sender` to `receiver` and log it on both sides.
pub fn move_funds(
    sender: &mut PlayerRecord,
    receiver: &mut PlayerRecord,
    transfer: &PendingTransfer,
    now: DateTime<Utc>,
) {
    debit(sender, transfer, now);
    credit(receiver, transfer, now);
}

fn debit(record: &mut PlayerRecord, transfer: &PendingTransfer, now: DateTime<Utc>) {
    record.balance = record.balance.saturating_sub_unsigned(transfer.money);
    for (item, qty) in &transfer.items {
        adjust_item(&mut record.inventory, item, qty.saturating_neg());
    }
    record.action_history.push(ActionRecord::TransferSent {
        to: transfer.receiver_id,
        money: transfer.money,
        items: transfer.items.clone(),
        message: transfer.message.clone(),
        timestamp: now,
    });
}

fn credit(record: &mut PlayerRecord, transfer: &PendingTransfer, now: DateTime<Utc>) {
    record.balance = record.balance.saturating_add_unsigned(transfer.money);
    for (item, qty) in &transfer.items {
        adjust_item(&mut record.inventory, item, *qty);
    }
    record.action_history.push(ActionRecord::TransferReceived {
        from: transfer.sender_id,
        money: transfer.money,
        items: transfer.items.clone(),
        message: transfer.message.clone(),
        timestamp: now,
    });
}

/// Apply a signed change; a quantity at or below zero removes the item.
fn adjust_item(inventory: &mut BTreeMap<String, u32>, item: &str, delta: i64) {
    let current = i64::from(inventory.get(item).copied().unwrap_or(0));
    let next = current.saturating_add(delta);
    if next <= 0 {
        inventory.remove(item);
    } else {
        inventory.insert(item.to_owned(), u32::try_from(next).unwrap_or(u32::MAX));
    }
}
