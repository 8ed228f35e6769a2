//! Message log shared by every front-end
//!
//! Messages are only ever appended. Each append hands back a [`MessageId`],
//! which is the one way to reach that message again; callers never look a
//! message up by its position in the log.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Extra markers a message can carry besides its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTag {
    /// Placeholder still waiting for its answer
    Thinking,
}

/// Opaque handle to one message in a [`ChatLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    pub tags: Vec<MessageTag>,
}

impl ChatMessage {
    pub fn has_tag(&self, tag: MessageTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_thinking(&self) -> bool {
        self.has_tag(MessageTag::Thinking)
    }
}

#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    next_id: u64,
    scroll_requested: bool,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and ask the view to bring it into sight.
    pub fn append(&mut self, text: impl Into<String>, role: ChatRole, tags: &[MessageTag]) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;

        let mut own_tags = Vec::with_capacity(tags.len());
        for tag in tags {
            if !own_tags.contains(tag) {
                own_tags.push(*tag);
            }
        }

        self.messages.push(ChatMessage {
            id,
            role,
            content: text.into(),
            tags: own_tags,
        });
        self.scroll_requested = true;
        id
    }

    /// Replace a placeholder's text and drop its `Thinking` tag.
    ///
    /// Succeeds once per placeholder; later calls leave the message untouched.
    pub fn resolve(&mut self, id: MessageId, text: impl Into<String>) -> Result<(), ResolveError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ResolveError::UnknownMessage(id.raw()))?;

        if !message.is_thinking() {
            return Err(ResolveError::AlreadyResolved(id.raw()));
        }

        message.tags.retain(|t| *t != MessageTag::Thinking);
        message.content = text.into();
        Ok(())
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
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

    pub fn has_thinking(&self) -> bool {
        self.messages.iter().any(ChatMessage::is_thinking)
    }

    /// Returns true once after any append, so the view can follow the tail.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}
