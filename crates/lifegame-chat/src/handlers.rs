//! REST endpoint handlers for the chat API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text status line |
//! | `POST` | `/api/messages` | Route a player's text message |
//! | `POST` | `/api/callbacks` | Resolve an inline button press |
//! | `GET` | `/api/players/{id}/inbox` | Drain messages parked for a player |
//! | `GET` | `/api/top` | Leaderboard by balance |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use lifegame_runner::Completion;
use lifegame_types::PlayerId;
use serde::Serialize;

use crate::error::ChatError;
use crate::format::LEADERBOARD_SIZE;
use crate::message::{CallbackQuery, IncomingMessage, OutgoingMessage};
use crate::state::AppState;

/// Replies for the requester.
#[derive(Debug, Serialize)]
pub struct Replies {
    /// Messages in display order.
    pub messages: Vec<OutgoingMessage>,
}

/// Messages that were parked for a player.
#[derive(Debug, Serialize)]
pub struct Inbox {
    /// Whose inbox this is.
    pub player_id: PlayerId,
    /// Messages, oldest first.
    pub messages: Vec<OutgoingMessage>,
}

/// One leaderboard row.
#[derive(Debug, Serialize)]
pub struct RankedPlayer {
    /// 1-based rank.
    pub rank: usize,
    /// Player id.
    pub id: PlayerId,
    /// `@handle` or display name.
    pub name: String,
    /// Current balance.
    pub balance: i64,
}

/// Leaderboard response.
#[derive(Debug, Serialize)]
pub struct Leaderboard {
    /// Richest first.
    pub players: Vec<RankedPlayer>,
}

/// Status line with queue and transfer counters.
pub async fn index<C: Completion + 'static>(State(state): State<Arc<AppState<C>>>) -> String {
    format!(
        "Lifegame chat bot running since {}: {} queued actions, {} pending transfers",
        state.started_at.to_rfc3339(),
        state.bot.queue().depth(),
        state.bot.desk().pending().len().await,
    )
}

/// `POST /api/messages`
pub async fn post_message<C: Completion + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Json(body): Json<IncomingMessage>,
) -> Result<Json<Replies>, ChatError> {
    let messages = state.bot.handle_message(body).await?;
    Ok(Json(Replies { messages }))
}

/// `POST /api/callbacks`
pub async fn post_callback<C: Completion + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Json(body): Json<CallbackQuery>,
) -> Result<Json<Replies>, ChatError> {
    let messages = state.bot.handle_callback(body).await?;
    Ok(Json(Replies { messages }))
}

/// `GET /api/players/{id}/inbox`
pub async fn get_inbox<C: Completion + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<i64>,
) -> Json<Inbox> {
    let player_id = PlayerId::new(id);
    let messages = state.bot.mailbox().drain(player_id).await;
    Json(Inbox {
        player_id,
        messages,
    })
}

/// `GET /api/top`
pub async fn get_top<C: Completion + 'static>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Leaderboard>, ChatError> {
    let records = state.bot.store().leaderboard(LEADERBOARD_SIZE).await?;
    let players = (1_usize..)
        .zip(records)
        .map(|(rank, record)| RankedPlayer {
            rank,
            id: record.id,
            name: record.public_name(),
            balance: record.balance,
        })
        .collect();
    Ok(Json(Leaderboard { players }))
}
