// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Chat history persistence.
//!
//! The conversation is an append-only list of messages, seeded with a
//! greeting and stored as JSON under [`CHAT_HISTORY_KEY`] after every
//! append so it survives a restart. A stored value that no longer parses is
//! replaced by the greeting instead of failing.

use std::sync::Arc;

use crate::storage::{KeyValueStore, StoreError};
use crate::types::{ChatMessage, Role};

pub const CHAT_HISTORY_KEY: &str = "chatMessages";

/// First message of every conversation.
pub const GREETING: &str =
    "Hello! I can answer questions about your uploaded documents. What would you like to know?";

fn seeded() -> Vec<ChatMessage> {
    vec![ChatMessage::system(GREETING)]
}

/// Ordered chat messages backed by a key/value store.
pub struct ChatHistory {
    store: Arc<dyn KeyValueStore>,
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Load the persisted conversation, or start one with the greeting.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let messages = match store.get(CHAT_HISTORY_KEY)? {
            None => seeded(),
            Some(raw) => match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
                Ok(messages) if !messages.is_empty() => messages,
                Ok(_) => seeded(),
                Err(e) => {
                    tracing::warn!("HISTORY_CORRUPT | error=\"{}\" resetting to greeting", e);
                    let messages = seeded();
                    store.set(CHAT_HISTORY_KEY, &serde_json::to_string(&messages)?)?;
                    messages
                }
            },
        };

        tracing::debug!("HISTORY_LOADED | messages={}", messages.len());
        Ok(Self { store, messages })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Append a message and persist the whole conversation.
    ///
    /// The in-memory list only changes once the store accepted the write.
    pub fn push(&mut self, message: ChatMessage) -> Result<&ChatMessage, StoreError> {
        let mut next = self.messages.clone();
        next.push(message);
        self.store
            .set(CHAT_HISTORY_KEY, &serde_json::to_string(&next)?)?;
        self.messages = next;
        let index = self.messages.len() - 1;
        Ok(&self.messages[index])
    }

    pub fn push_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<&ChatMessage, StoreError> {
        self.push(ChatMessage::new(role, content))
    }

    /// Start over from the greeting and persist that.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.messages = seeded();
        self.persist()?;
        tracing::info!("HISTORY_CLEARED");
        Ok(())
    }

    /// Reset the in-memory copy only; used after logout already removed the
    /// stored key.
    pub fn discard(&mut self) {
        self.messages = seeded();
    }

    fn persist(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&self.messages)?;
        self.store.set(CHAT_HISTORY_KEY, &encoded)
    }
}
