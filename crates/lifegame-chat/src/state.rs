//! Shared application state for the chat API server.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::bot::ChatBot;

/// State shared by every request handler.
pub struct AppState<C> {
    /// The bot every request is routed to.
    pub bot: Arc<ChatBot<C>>,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
}

impl<C> AppState<C> {
    /// Wrap a running bot.
    pub fn new(bot: Arc<ChatBot<C>>) -> Self {
        Self {
            bot,
            started_at: Utc::now(),
        }
    }
}
