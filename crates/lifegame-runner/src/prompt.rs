//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are read from a directory at startup so operators can tune the
//! game master without recompiling. A template missing on disk falls back
//! to the copy compiled into the binary.

use std::collections::BTreeMap;
use std::path::Path;

use lifegame_types::{INVENTORY_CAPACITY, PlayerRecord};
use minijinja::Environment;
use tracing::{info, warn};

use crate::error::RunnerError;

/// Number of remembered messages quoted in the game-master prompt.
pub const RECENT_ACTIONS_IN_PROMPT: usize = 3;

const GAME_MASTER: &str = "game_master";
const TRANSFER_PARSE: &str = "transfer_parse";
const TRANSFER_VALIDATE: &str = "transfer_validate";

/// Template name and built-in source.
const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    (GAME_MASTER, include_str!("../templates/game_master.j2")),
    (TRANSFER_PARSE, include_str!("../templates/transfer_parse.j2")),
    (TRANSFER_VALIDATE, include_str!("../templates/transfer_validate.j2")),
];

/// Everything the validation prompt shows about a proposed transfer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationContext {
    /// Sender id.
    pub sender_id: i64,
    /// Sender's current balance.
    pub sender_balance: i64,
    /// Sender's inventory, rendered as text.
    pub sender_inventory: String,
    /// Receiver id.
    pub receiver_id: i64,
    /// Receiver's current balance.
    pub receiver_balance: i64,
    /// Receiver's inventory, rendered as text.
    pub receiver_inventory: String,
    /// Receiver's total item count.
    pub receiver_count: u32,
    /// Inventory capacity.
    pub capacity: u32,
    /// Money to move.
    pub money: u64,
    /// Items to move, rendered as text.
    pub items: String,
}

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Load templates from `dir`, using built-in copies for missing files.
    ///
    /// Expects `game_master.j2`, `transfer_parse.j2`, `transfer_validate.j2`.
    pub fn load(dir: &Path) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, builtin) in BUILTIN_TEMPLATES {
            let path = dir.join(format!("{name}.j2"));
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => {
                    info!(template = name, path = %path.display(), "loaded prompt template");
                    source
                }
                Err(e) => {
                    warn!(
                        template = name,
                        path = %path.display(),
                        error = %e,
                        "prompt template unavailable, using built-in"
                    );
                    builtin.to_owned()
                }
            };
            env.add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// An engine holding only the built-in templates.
    pub fn builtin() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: &impl serde::Serialize) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(ctx)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }

    /// System prompt for a narrated action: instructions plus the player's
    /// balance, inventory, occupancy, and last few messages.
    pub fn render_game_master(&self, record: &PlayerRecord) -> Result<String, RunnerError> {
        let inventory: Vec<serde_json::Value> = record
            .inventory
            .iter()
            .map(|(name, quantity)| serde_json::json!({ "name": name, "quantity": quantity }))
            .collect();
        let recent_actions: Vec<&str> = record
            .recent_messages(RECENT_ACTIONS_IN_PROMPT)
            .iter()
            .map(|m| m.content.as_str())
            .collect();

        self.render(
            GAME_MASTER,
            &serde_json::json!({
                "balance": record.balance,
                "inventory": inventory,
                "inventory_count": record.inventory_count(),
                "capacity": INVENTORY_CAPACITY,
                "recent_actions": recent_actions,
            }),
        )
    }

    /// Few-shot instructions for turning free text into transfer tags.
    pub fn render_transfer_parse(&self) -> Result<String, RunnerError> {
        self.render(TRANSFER_PARSE, &serde_json::json!({}))
    }

    /// Instructions for judging a proposed transfer.
    pub fn render_transfer_validate(&self, ctx: &ValidationContext) -> Result<String, RunnerError> {
        self.render(TRANSFER_VALIDATE, ctx)
    }
}

/// Render an item map as `name: qty, name: qty`, or `empty`.
pub fn describe_items<V: core::fmt::Display>(items: &BTreeMap<String, V>) -> String {
    if items.is_empty() {
        return "empty".to_owned();
    }
    items
        .iter()
        .map(|(name, qty)| format!("{name}: {qty}"))
        .collect::<Vec<_>>()
        .join(", ")
}
