//! Conversation state for one client.
//!
//! A conversation owns the session tokens and ordered message history for a
//! single client. Token lifecycle:
//!
//! - `current_token` is sourced once at creation (negotiation) and must be
//!   presented on every chat call;
//! - after each completed turn the upstream's refreshed token replaces it,
//!   while the token used for that turn moves into `previous_token`;
//! - [`Conversation::undo_turn`] restores the pre-turn state.
//!
//! An upstream response may omit the refreshed token. The conversation then
//! stays inspectable but [`Conversation::can_take_turn`] reports `false`.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::model::ChatModel;

/// Opaque session credential issued by the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token value. Empty tokens are representable on purpose:
    /// an upstream response may omit the refresh header.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token carries no value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Per-client chat state: session tokens plus ordered history.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Token used for the last completed turn.
    previous_token: SessionToken,
    /// Token to present on the next outbound chat call.
    current_token: SessionToken,
    /// Backend model, fixed at creation.
    model: ChatModel,
    /// Messages in submission order, oldest first.
    history: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation from a freshly negotiated session token.
    pub fn new(token: SessionToken, model: ChatModel) -> Self {
        Self {
            previous_token: token.clone(),
            current_token: token,
            model,
            history: Vec::new(),
        }
    }

    pub fn model(&self) -> ChatModel {
        self.model
    }

    pub fn current_token(&self) -> &SessionToken {
        &self.current_token
    }

    pub fn previous_token(&self) -> &SessionToken {
        &self.previous_token
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Whether the conversation holds a usable session token.
    pub fn can_take_turn(&self) -> bool {
        !self.current_token.is_empty()
    }

    /// Appends the caller's message ahead of an outbound chat call.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(Message::user(content));
    }

    /// Commits a completed turn: rotates tokens and records the aggregated
    /// assistant reply.
    ///
    /// `refreshed` may be empty when the upstream omitted the refresh header;
    /// the conversation then degrades to read-only until deleted.
    pub fn complete_turn(&mut self, reply: impl Into<String>, refreshed: SessionToken) {
        self.previous_token = std::mem::replace(&mut self.current_token, refreshed);
        self.history.push(Message::assistant(reply));
    }

    /// Restores the state before the most recent turn: the previous token
    /// becomes current again and the latest user/assistant pair is dropped.
    pub fn undo_turn(&mut self) {
        self.current_token = self.previous_token.clone();
        if self.history.len() >= 2 {
            self.history.truncate(self.history.len() - 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::Role;

    fn conversation() -> Conversation {
        Conversation::new(SessionToken::new("T1"), ChatModel::Llama)
    }

    #[test]
    fn new_conversation_has_empty_history_and_usable_token() {
        let conv = conversation();
        assert!(conv.history().is_empty());
        assert!(conv.can_take_turn());
        assert_eq!(conv.current_token().as_str(), "T1");
        assert_eq!(conv.previous_token().as_str(), "T1");
        assert_eq!(conv.model(), ChatModel::Llama);
    }

    #[test]
    fn complete_turn_rotates_tokens_and_appends_assistant() {
        let mut conv = conversation();
        conv.push_user("hello");
        conv.complete_turn("Hi there", SessionToken::new("T2"));

        assert_eq!(conv.previous_token().as_str(), "T1");
        assert_eq!(conv.current_token().as_str(), "T2");
        assert_eq!(
            conv.history(),
            &[Message::user("hello"), Message::assistant("Hi there")]
        );
    }

    #[test]
    fn history_alternates_over_multiple_turns() {
        let mut conv = conversation();
        for n in 0..3 {
            conv.push_user(format!("question {n}"));
            conv.complete_turn(format!("answer {n}"), SessionToken::new(format!("T{}", n + 2)));
        }

        assert_eq!(conv.history().len(), 6);
        for (i, message) in conv.history().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
        assert_eq!(conv.current_token().as_str(), "T4");
        assert_eq!(conv.previous_token().as_str(), "T3");
    }

    #[test]
    fn empty_refresh_token_degrades_conversation() {
        let mut conv = conversation();
        conv.push_user("hello");
        conv.complete_turn("hi", SessionToken::default());

        assert!(!conv.can_take_turn());
        // History stays inspectable.
        assert_eq!(conv.history().len(), 2);
    }

    #[test]
    fn undo_turn_restores_token_and_drops_last_pair() {
        let mut conv = conversation();
        conv.push_user("hello");
        conv.complete_turn("Hi there", SessionToken::new("T2"));

        conv.undo_turn();

        assert_eq!(conv.current_token().as_str(), "T1");
        assert!(conv.history().is_empty());
    }

    #[test]
    fn undo_turn_on_short_history_only_restores_token() {
        let mut conv = conversation();
        conv.push_user("hello");
        conv.undo_turn();

        // Fewer than two entries: history untouched.
        assert_eq!(conv.history(), &[Message::user("hello")]);
        assert_eq!(conv.current_token().as_str(), "T1");
    }
}
