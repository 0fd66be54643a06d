//! LLM orchestration for the Lifegame chat economy.
//!
//! The runner turns free text into game state. A player's message either
//! narrates an action or asks to give something to another player:
//!
//! ```text
//! action:   ActionQueue --> ActionProcessor --> Completion --> parse --> PlayerStore
//! transfer: TransferDesk --parse--> Completion --validate--> Completion --> PendingTransfers
//!           accept --> execute --> PlayerStore (both sides)
//! ```
//!
//! The model speaks a small tag language embedded in its prose
//! (`<balance=900>`, `<inventory:apple=+1>`, `<valid=true>`). Tags are
//! decoded by [`tags`] and [`parse`], then stripped from what the player
//! sees.

pub mod action;
pub mod config;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod queue;
pub mod tags;
pub mod transfer;

pub use action::ActionProcessor;
pub use config::{BackendType, LlmBackendConfig};
pub use error::{RunnerError, TransferError};
pub use llm::{Completion, LlmBackend, ScriptedCompletion, create_backend};
pub use prompt::PromptEngine;
pub use queue::{ActionQueue, QueueTicket};
pub use transfer::{PendingTransfers, TransferDesk};
