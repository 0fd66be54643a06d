//! The action processor: from a player's free text to a mutated record.
//!
//! One call to [`ActionProcessor::apply`]:
//! 1. Renders the game-master system prompt from the player's state
//! 2. Appends the remembered conversation and the new input
//! 3. Calls the completion client and decodes the reply tags
//! 4. Sets the balance to the directive's absolute value
//! 5. Applies inventory deltas, rejecting any that would overflow capacity
//! 6. Appends an audit entry if anything applied
//! 7. Remembers the input and the reply
//! 8. Persists the record
//! 9. Renders the message shown to the player

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lifegame_store::PlayerStore;
use lifegame_types::{ActionRecord, ChatTurn, INVENTORY_CAPACITY, PlayerId, PlayerRecord, Role};
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::llm::Completion;
use crate::parse::{ActionReply, parse_action_reply};
use crate::prompt::PromptEngine;

/// Appended to the narration for each item change refused for lack of space.
pub const CAPACITY_WARNING: &str = "⚠️ Not enough inventory space! Maximum 20 items.";

/// Prefix of the message shown when processing fails outright.
pub const PROCESSING_ERROR: &str = "❌ Processing error";

/// What an action reply actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Balance before and after, when a balance directive was present.
    pub balance: Option<(i64, i64)>,
    /// One note per applied inventory change.
    pub inventory_notes: Vec<String>,
    /// Items whose change was refused by the capacity check.
    pub rejected_items: Vec<String>,
    /// Whether at least one inventory delta passed the capacity check.
    pub inventory_changed: bool,
}

impl AppliedChanges {
    /// Whether anything worth auditing happened.
    pub const fn any(&self) -> bool {
        self.balance.is_some() || self.inventory_changed
    }
}

/// Applies narrated actions to player records.
pub struct ActionProcessor<C> {
    completion: Arc<C>,
    prompts: Arc<PromptEngine>,
    store: Arc<PlayerStore>,
}

impl<C: Completion> ActionProcessor<C> {
    /// Create a processor over the given collaborators.
    pub const fn new(completion: Arc<C>, prompts: Arc<PromptEngine>, store: Arc<PlayerStore>) -> Self {
        Self {
            completion,
            prompts,
            store,
        }
    }

    /// The store records are loaded from and saved to.
    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    /// Load (or register) the player, then apply the input.
    pub async fn process(
        &self,
        player_id: PlayerId,
        display_name_hint: Option<&str>,
        handle_hint: Option<&str>,
        user_input: &str,
    ) -> String {
        let mut record = self
            .store
            .load(player_id, display_name_hint, handle_hint)
            .await;
        self.apply(user_input, &mut record).await
    }

    /// Run one action through the model and apply the result to `record`.
    ///
    /// Never fails: any error becomes a message starting with
    /// [`PROCESSING_ERROR`].
    pub async fn apply(&self, user_input: &str, record: &mut PlayerRecord) -> String {
        match self.try_apply(user_input, record).await {
            Ok(message) => message,
            Err(e) => {
                warn!(player_id = %record.id, error = %e, "action processing failed");
                format!("{PROCESSING_ERROR}: {e}")
            }
        }
    }

    async fn try_apply(
        &self,
        user_input: &str,
        record: &mut PlayerRecord,
    ) -> Result<String, RunnerError> {
        let system_prompt = self.prompts.render_game_master(record)?;
        let messages = build_messages(system_prompt, record, user_input);

        debug!(player_id = %record.id, turns = messages.len(), "requesting narration");
        let raw = self.completion.complete(&messages).await;
        let mut reply = parse_action_reply(&raw);

        let now = Utc::now();
        let changes = apply_reply(record, user_input, &mut reply, now);
        record.remember(Role::User, user_input, now);
        record.remember(Role::Assistant, reply.display_text.clone(), now);
        self.store.save(record).await;

        info!(
            player_id = %record.id,
            balance = record.balance,
            items = record.inventory_count(),
            changed = changes.any(),
            rejected = ?changes.rejected_items,
            "action processed"
        );
        Ok(render_message(&reply.display_text, &changes))
    }
}

/// System prompt, then the remembered conversation, then the new input.
pub fn build_messages(system_prompt: String, record: &PlayerRecord, user_input: &str) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(record.message_history.len().saturating_add(2));
    messages.push(ChatTurn::system(system_prompt));
    messages.extend(record.message_history.iter().map(lifegame_types::HistoryMessage::to_turn));
    messages.push(ChatTurn::user(user_input));
    messages
}

/// Apply a decoded reply's directives to `record`.
///
/// A refused item change appends [`CAPACITY_WARNING`] to the reply's
/// display text. The audit entry records the deltas exactly as the model
/// emitted them, refused ones included.
pub fn apply_reply(
    record: &mut PlayerRecord,
    user_input: &str,
    reply: &mut ActionReply,
    now: DateTime<Utc>,
) -> AppliedChanges {
    let mut changes = AppliedChanges::default();
    let old_balance = record.balance;

    if let Some(new_balance) = reply.balance_directive() {
        record.balance = new_balance;
        changes.balance = Some((old_balance, new_balance));
    }

    for (item, delta) in &reply.inventory {
        let delta = *delta;
        let current = i64::from(record.inventory.get(item).copied().unwrap_or(0));
        let new_qty = current.saturating_add(delta);
        let total = i64::from(record.inventory_count());

        if new_qty > 0 && total.saturating_add(delta) > i64::from(INVENTORY_CAPACITY) {
            debug!(player_id = %record.id, item = item.as_str(), delta, "inventory full, change refused");
            reply.display_text.push_str("\n\n");
            reply.display_text.push_str(CAPACITY_WARNING);
            changes.rejected_items.push(item.clone());
            continue;
        }

        if new_qty <= 0 {
            if record.inventory.remove(item).is_some() {
                changes.inventory_notes.push(format!("🗑️ {item} removed"));
            }
        } else {
            let stored = u32::try_from(new_qty).unwrap_or(u32::MAX);
            record.inventory.insert(item.clone(), stored);
            if delta > 0 {
                changes.inventory_notes.push(format!("📦 {item}: +{delta} (total: {stored})"));
            } else if delta < 0 {
                changes.inventory_notes.push(format!("📦 {item}: {delta} (total: {stored})"));
            }
        }
        changes.inventory_changed = true;
    }

    if changes.any() {
        record.action_history.push(ActionRecord::Action {
            action: user_input.to_owned(),
            old_balance,
            new_balance: record.balance,
            inventory_changes: reply.inventory.clone(),
            timestamp: now,
        });
    }

    changes
}

/// Narration, then the balance line, then the inventory notes.
pub fn render_message(display_text: &str, changes: &AppliedChanges) -> String {
    let mut message = format!("📊 {display_text}");

    if let Some((old, new)) = changes.balance {
        let _ = write!(message, "\n\n💳 BALANCE: {old}$ → {new}$");
        let change = new.saturating_sub(old);
        if change > 0 {
            let _ = write!(message, " (+{change}$) 📈");
        } else if change < 0 {
            let _ = write!(message, " ({change}$) 📉");
        }
    }

    if !changes.inventory_notes.is_empty() {
        message.push_str("\n\n🎒 INVENTORY:\n");
        message.push_str(&changes.inventory_notes.join("\n"));
    }

    message
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifegame_types::{MESSAGE_HISTORY_LIMIT, STARTING_BALANCE};

    use super::*;
    use crate::llm::ScriptedCompletion;
    use crate::tags::Tag;

    fn reply(inventory: &[(&str, i64)], balance: Option<i64>) -> ActionReply {
        ActionReply {
            display_text: "story".to_owned(),
            balance: balance.map_or(Tag::Absent, Tag::Present),
            inventory: inventory.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
        }
    }

    fn player() -> PlayerRecord {
        PlayerRecord::new(PlayerId(1), "Ann", "ann", Utc::now())
    }

    #[test]
    fn balance_directive_is_absolute() {
        let mut record = player();
        let mut r = reply(&[], Some(900));
        let changes = apply_reply(&mut record, "buy", &mut r, Utc::now());
        assert_eq!(record.balance, 900);
        assert_eq!(changes.balance, Some((1000, 900)));
        assert_eq!(record.action_history.len(), 1);
    }

    #[test]
    fn item_reaching_zero_is_removed() {
        let mut record = player();
        record.inventory.insert("apple".to_owned(), 2);
        let mut r = reply(&[("apple", -2)], None);
        let changes = apply_reply(&mut record, "eat", &mut r, Utc::now());
        assert!(!record.inventory.contains_key("apple"));
        assert_eq!(changes.inventory_notes, vec!["🗑️ apple removed".to_owned()]);
    }

    #[test]
    fn overdrawn_item_is_removed_not_stored_negative() {
        let mut record = player();
        record.inventory.insert("apple".to_owned(), 1);
        let mut r = reply(&[("apple", -5), ("ghost", -1)], None);
        apply_reply(&mut record, "eat", &mut r, Utc::now());
        assert!(record.inventory.is_empty());
    }

    #[test]
    fn capacity_overflow_rejects_only_that_item() {
        let mut record = player();
        record.inventory.insert("stone".to_owned(), 19);
        let mut r = reply(&[("gold", 2), ("stone", -4)], None);
        let changes = apply_reply(&mut record, "mine", &mut r, Utc::now());

        assert_eq!(record.inventory.get("gold"), None);
        assert_eq!(record.inventory.get("stone"), Some(&15));
        assert_eq!(changes.rejected_items, vec!["gold".to_owned()]);
        assert!(r.display_text.ends_with(CAPACITY_WARNING));
    }

    #[test]
    fn capacity_rejection_preserves_existing_quantity() {
        let mut record = player();
        record.inventory.insert("apple".to_owned(), 20);
        let mut r = reply(&[("apple", 1)], None);
        let changes = apply_reply(&mut record, "pick", &mut r, Utc::now());
        assert_eq!(record.inventory.get("apple"), Some(&20));
        assert!(!changes.any());
        assert!(record.action_history.is_empty());
    }

    #[test]
    fn filling_to_exact_capacity_is_allowed() {
        let mut record = player();
        record.inventory.insert("apple".to_owned(), 18);
        let mut r = reply(&[("pear", 2)], None);
        apply_reply(&mut record, "pick", &mut r, Utc::now());
        assert_eq!(record.inventory_count(), INVENTORY_CAPACITY);
    }

    #[test]
    fn audit_entry_keeps_rejected_deltas() {
        let mut record = player();
        record.inventory.insert("stone".to_owned(), 20);
        let mut r = reply(&[("gold", 1)], Some(1500));
        let now = Utc::now();
        apply_reply(&mut record, "mine", &mut r, now);

        assert_eq!(
            record.action_history.last(),
            Some(&ActionRecord::Action {
                action: "mine".to_owned(),
                old_balance: 1000,
                new_balance: 1500,
                inventory_changes: std::collections::BTreeMap::from([("gold".to_owned(), 1)]),
                timestamp: now,
            })
        );
    }

    #[test]
    fn render_message_formats_balance_and_items() {
        let changes = AppliedChanges {
            balance: Some((1000, 900)),
            inventory_notes: vec!["📦 apple: +1 (total: 1)".to_owned()],
            rejected_items: Vec::new(),
            inventory_changed: true,
        };
        let message = render_message("You bought an apple.", &changes);
        assert_eq!(
            message,
            "📊 You bought an apple.\n\n💳 BALANCE: 1000$ → 900$ (-100$) 📉\n\n🎒 INVENTORY:\n📦 apple: +1 (total: 1)"
        );
    }

    #[test]
    fn render_message_marks_gains() {
        let changes = AppliedChanges {
            balance: Some((100, 250)),
            ..AppliedChanges::default()
        };
        assert!(render_message("Paid.", &changes).ends_with("(+150$) 📈"));
    }

    #[test]
    fn build_messages_orders_system_history_input() {
        let mut record = player();
        record.remember(Role::User, "earlier", Utc::now());
        record.remember(Role::Assistant, "reply", Utc::now());
        let messages = build_messages("rules".to_owned(), &record, "now");
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages.last().unwrap().content, "now");
    }

    async fn processor(replies: &[&str]) -> (tempfile::TempDir, Arc<ScriptedCompletion>, ActionProcessor<ScriptedCompletion>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PlayerStore::open(dir.path()).await.unwrap());
        let completion = Arc::new(ScriptedCompletion::new(replies.iter().copied()));
        let prompts = Arc::new(PromptEngine::builtin().unwrap());
        let processor = ActionProcessor::new(Arc::clone(&completion), prompts, store);
        (dir, completion, processor)
    }

    #[tokio::test]
    async fn apply_mutates_and_persists_the_record() {
        let (_dir, _completion, processor) =
            processor(&["Ты нашёл яблоко! <balance=900><inventory:яблоко=1>"]).await;
        let mut record = processor.store.load(PlayerId(7), None, None).await;
        assert_eq!(record.balance, STARTING_BALANCE);

        let message = processor.apply("ищу еду", &mut record).await;

        assert_eq!(record.balance, 900);
        assert_eq!(record.inventory.get("яблоко"), Some(&1));
        assert!(message.starts_with("📊 Ты нашёл яблоко!"));
        assert!(!message.contains("<balance"));

        let stored = processor.store.find(PlayerId(7)).await.unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn apply_remembers_input_and_reply() {
        let (_dir, completion, processor) = processor(&["First. <balance=1000>", "Second."]).await;
        let mut record = processor.store.load(PlayerId(7), None, None).await;

        processor.apply("one", &mut record).await;
        processor.apply("two", &mut record).await;

        let contents: Vec<&str> = record.message_history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "First.", "two", "Second."]);

        let requests = completion.requests().await;
        let second = requests.get(1).unwrap();
        assert_eq!(second.len(), 4, "system + two remembered turns + input");
        assert!(second.first().unwrap().content.contains("- First."));
    }

    #[tokio::test]
    async fn message_history_window_slides() {
        let replies: Vec<String> = (0..4).map(|i| format!("reply {i}")).collect();
        let (_dir, _completion, processor) =
            processor(&replies.iter().map(String::as_str).collect::<Vec<_>>()).await;
        let mut record = processor.store.load(PlayerId(7), None, None).await;
        for i in 0..4 {
            processor.apply(&format!("input {i}"), &mut record).await;
        }
        assert_eq!(record.message_history.len(), MESSAGE_HISTORY_LIMIT);
        assert_eq!(record.message_history.last().unwrap().content, "reply 3");
        assert_eq!(record.message_history.first().unwrap().content, "reply 1");
    }

    #[tokio::test]
    async fn completion_error_leaves_balance_untouched() {
        let (_dir, _completion, processor) = processor(&["Error: API returned 503: busy"]).await;
        let mut record = processor.store.load(PlayerId(7), None, None).await;

        let message = processor.apply("work", &mut record).await;

        assert_eq!(record.balance, STARTING_BALANCE);
        assert!(record.action_history.is_empty());
        assert!(message.contains("Error: API returned 503"));
    }
}
