//! Platform-neutral chat payloads.

use lifegame_types::PlayerId;
use serde::{Deserialize, Serialize};

/// A text message from a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Who wrote it.
    pub player_id: PlayerId,
    /// What they wrote.
    pub text: String,
    /// Platform display name, used when registering a new player.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Platform handle without the `@`, used when registering a new player.
    #[serde(default)]
    pub handle: Option<String>,
}

/// A press of an inline button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Who pressed it.
    pub player_id: PlayerId,
    /// The button's payload, e.g. `accept_<transfer id>`.
    pub data: String,
}

/// An inline button attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Text on the button.
    pub label: String,
    /// Payload sent back in a [`CallbackQuery`].
    pub data: String,
}

/// A message from the bot to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Message body.
    pub text: String,
    /// Inline buttons, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutgoingMessage {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// A message with inline buttons.
    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }
}
