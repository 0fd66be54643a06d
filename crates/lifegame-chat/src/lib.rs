//! Chat surface for the Lifegame bot.
//!
//! [`ChatBot`] is platform-neutral: it takes text messages and button
//! presses and returns replies. The Axum API in [`router`] exposes it over
//! HTTP so any chat platform adapter (or a plain `curl`) can drive it.
//! Messages addressed to someone other than the requester wait in the
//! [`Mailbox`] until that player's client polls its inbox.

pub mod bot;
pub mod error;
pub mod format;
pub mod handlers;
pub mod mailbox;
pub mod message;
pub mod router;
pub mod server;
pub mod state;

pub use bot::ChatBot;
pub use error::ChatError;
pub use mailbox::Mailbox;
pub use message::{Button, CallbackQuery, IncomingMessage, OutgoingMessage};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
