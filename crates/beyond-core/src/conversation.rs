//! The session's append-only message log and the error banner that goes with it.
//!
//! This module doesn't depend on any UI framework; the terminal front end and
//! tests drive it the same way.

use serde::{Deserialize, Serialize};

use crate::service::ChatError;

/// Banner shown after a failed exchange, until the next successful one.
pub const FAILURE_BANNER: &str = "Failed to get response. Check the backend.";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Beyond Ai",
        }
    }
}

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }
}

/// An exchange that has been recorded locally and still has to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub id: u64,
    pub message: String,
}

/// The result of sending an [`ExchangeRequest`].
#[derive(Debug)]
pub struct ExchangeOutcome {
    pub id: u64,
    pub result: Result<String, ChatError>,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    error: Option<String>,
    in_flight: usize,
    next_id: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the user's message and hands back the request to send.
    pub fn submit(&mut self, text: impl Into<String>) -> ExchangeRequest {
        let text = text.into();
        self.messages.push(Message::user(text.clone()));
        self.in_flight += 1;

        let id = self.next_id;
        self.next_id += 1;
        tracing::info!(id, index = self.messages.len() - 1, "user message recorded");

        ExchangeRequest { id, message: text }
    }

    /// Applies a finished exchange. Outcomes are applied in whatever order they
    /// arrive; a failure never removes the user message that started it.
    ///
    /// Returns true when an assistant message was appended.
    pub fn complete(&mut self, outcome: ExchangeOutcome) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome.result {
            Ok(response) => {
                self.messages.push(Message::assistant(response));
                self.error = None;
                tracing::info!(id = outcome.id, index = self.messages.len() - 1, "assistant reply appended");
                true
            }
            Err(e) => {
                tracing::error!(id = outcome.id, "chat exchange failed: {}", e);
                self.error = Some(FAILURE_BANNER.to_string());
                false
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight > 0
    }
}
