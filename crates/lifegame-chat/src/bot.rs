//! Command routing for the chat surface.
//!
//! [`ChatBot`] owns the game pipeline and maps each incoming message or
//! button press to replies for the requester. Messages for anyone else
//! (transfer offers and resolution notices) go to the [`Mailbox`].

use std::sync::Arc;

use lifegame_runner::{
    ActionProcessor, ActionQueue, Completion, PromptEngine, TransferDesk, TransferError,
};
use lifegame_store::PlayerStore;
use lifegame_types::{PlayerId, PlayerRecord, TransferId};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::format;
use crate::mailbox::Mailbox;
use crate::message::{Button, CallbackQuery, IncomingMessage, OutgoingMessage};

/// Substrings that mark a free-text message as a transfer command.
pub const TRANSFER_KEYWORDS: [&str; 7] = [
    "передать", "кинуть", "отдать", "дать", "give", "send", "transfer",
];

const ACCEPT_PREFIX: &str = "accept_";
const REJECT_PREFIX: &str = "reject_";

/// Whether free text should go to the transfer desk instead of the queue.
pub fn is_transfer_command(text: &str) -> bool {
    let lowered = text.to_lowercase();
    TRANSFER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// The chat bot: command router over the game pipeline.
pub struct ChatBot<C> {
    store: Arc<PlayerStore>,
    queue: ActionQueue,
    desk: TransferDesk<C>,
    mailbox: Mailbox,
}

impl<C: Completion + 'static> ChatBot<C> {
    /// Wire the pipeline and start the action queue worker.
    pub fn start(
        completion: Arc<C>,
        prompts: Arc<PromptEngine>,
        store: Arc<PlayerStore>,
    ) -> (Self, JoinHandle<()>) {
        let processor = Arc::new(ActionProcessor::new(
            Arc::clone(&completion),
            Arc::clone(&prompts),
            Arc::clone(&store),
        ));
        let (queue, worker) = ActionQueue::spawn(processor);
        let desk = TransferDesk::new(completion, prompts, Arc::clone(&store));
        let bot = Self {
            store,
            queue,
            desk,
            mailbox: Mailbox::new(),
        };
        (bot, worker)
    }

    /// The player store.
    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    /// The action queue.
    pub const fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// The transfer desk.
    pub const fn desk(&self) -> &TransferDesk<C> {
        &self.desk
    }

    /// Messages waiting for players other than the requester.
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Route a text message and return the replies for its author.
    ///
    /// A narrated action waits for its turn in the queue; the first reply
    /// is the queue notice, the second the outcome.
    pub async fn handle_message(
        &self,
        message: IncomingMessage,
    ) -> Result<Vec<OutgoingMessage>, ChatError> {
        let text = message.text.trim();
        if text.is_empty() {
            return Err(ChatError::InvalidRequest("message text is empty".to_owned()));
        }

        if let Some(command) = text.strip_prefix('/') {
            return self.handle_command(&message, command).await;
        }
        if is_transfer_command(text) {
            return self.handle_transfer(&message, text).await;
        }

        let ticket = self.queue.submit(
            message.player_id,
            message.display_name.clone(),
            message.handle.clone(),
            text.to_owned(),
        )?;
        let notice = OutgoingMessage::text(format::queued(ticket.position));
        let outcome = ticket
            .reply
            .await
            .map_err(|e| ChatError::Internal(format!("action worker dropped the request: {e}")))?;
        Ok(vec![notice, OutgoingMessage::text(outcome)])
    }

    async fn handle_command(
        &self,
        message: &IncomingMessage,
        command: &str,
    ) -> Result<Vec<OutgoingMessage>, ChatError> {
        let mut words = command.split_whitespace();
        let name = words
            .next()
            .and_then(|w| w.split('@').next())
            .unwrap_or_default();
        let argument = words.next();
        debug!(player_id = %message.player_id, command = name, "command received");

        let reply = match name {
            "start" => {
                let record = self.requester(message).await;
                let greeting_name = message
                    .display_name
                    .as_deref()
                    .unwrap_or(record.display_name.as_str());
                format::welcome(greeting_name, &record)
            }
            "profile" => match argument {
                Some(raw) => match raw.parse::<PlayerId>() {
                    Ok(id) => self
                        .store
                        .find(id)
                        .await
                        .map_or_else(|| "❌ Player not found".to_owned(), |r| format::profile(&r)),
                    Err(_) => "❌ Invalid player ID".to_owned(),
                },
                None => format::profile(&self.requester(message).await),
            },
            "balance" => format::balance(&self.requester(message).await),
            "inventory" => format::inventory(&self.requester(message).await),
            "top" => format::leaderboard(&self.store.leaderboard(format::LEADERBOARD_SIZE).await?),
            _ => "❓ Unknown command. Send /start to see the list of commands.".to_owned(),
        };
        Ok(vec![OutgoingMessage::text(reply)])
    }

    async fn requester(&self, message: &IncomingMessage) -> PlayerRecord {
        self.store
            .load(
                message.player_id,
                message.display_name.as_deref(),
                message.handle.as_deref(),
            )
            .await
    }

    async fn handle_transfer(
        &self,
        message: &IncomingMessage,
        text: &str,
    ) -> Result<Vec<OutgoingMessage>, ChatError> {
        self.requester(message).await;
        let request = self.desk.parse_command(text).await?;
        // Id 0 is what the model writes when it could not find a receiver.
        let Some(receiver_id) = request.receiver_id.filter(|id| id.0 != 0) else {
            return Ok(vec![OutgoingMessage::text(format::transfer_usage())]);
        };

        let created = self
            .desk
            .create(
                message.player_id,
                receiver_id,
                request.money,
                request.items,
                request.message,
            )
            .await;
        let id = match created {
            Ok(id) => id,
            Err(e) => return Ok(vec![OutgoingMessage::text(e.to_string())]),
        };

        let transfer = self
            .desk
            .pending()
            .get(&id)
            .await
            .ok_or_else(|| ChatError::Internal(format!("transfer {id} vanished")))?;
        let offer = OutgoingMessage::with_buttons(
            format::transfer_offer(&transfer),
            vec![
                Button {
                    label: "✅ Accept".to_owned(),
                    data: format!("{ACCEPT_PREFIX}{id}"),
                },
                Button {
                    label: "❌ Reject".to_owned(),
                    data: format!("{REJECT_PREFIX}{id}"),
                },
            ],
        );
        self.mailbox.push(receiver_id, offer).await;
        info!(transfer_id = %id, receiver_id = %receiver_id, "transfer offer delivered");
        Ok(vec![OutgoingMessage::text("✅ Transfer request sent!")])
    }

    /// Resolve an accept/reject button press.
    pub async fn handle_callback(
        &self,
        callback: CallbackQuery,
    ) -> Result<Vec<OutgoingMessage>, ChatError> {
        let actor = callback.player_id;
        let data = callback.data.as_str();

        let reply = if let Some(raw) = data.strip_prefix(ACCEPT_PREFIX) {
            match self.desk.accept(&TransferId::from(raw), actor).await {
                Ok(transfer) => {
                    let notice = format::transfer_accepted(actor, &transfer);
                    self.mailbox
                        .push(transfer.sender_id, OutgoingMessage::text(notice))
                        .await;
                    "✅ Transfer accepted!".to_owned()
                }
                Err(e) => resolution_failure(&e),
            }
        } else if let Some(raw) = data.strip_prefix(REJECT_PREFIX) {
            match self.desk.reject(&TransferId::from(raw), actor).await {
                Ok(transfer) => {
                    let notice = format::transfer_rejected(actor);
                    self.mailbox
                        .push(transfer.sender_id, OutgoingMessage::text(notice))
                        .await;
                    "❌ Transfer rejected".to_owned()
                }
                Err(e) => resolution_failure(&e),
            }
        } else {
            return Err(ChatError::InvalidRequest(format!("unknown callback data: {data}")));
        };
        Ok(vec![OutgoingMessage::text(reply)])
    }
}

fn resolution_failure(error: &TransferError) -> String {
    debug!(error = %error, "transfer resolution refused");
    error.to_string()
}
