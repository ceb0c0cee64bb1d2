//! Mock chat backend for testing.
//!
//! Scripted implementation of the ChatBackend port: tests queue negotiation
//! results and turn outcomes up front, then verify what the gateway sent.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::chat::{ChatModel, Message, SessionToken};
use crate::ports::{BackendError, ChatBackend, TurnResponse};

/// A scripted negotiation outcome.
#[derive(Debug, Clone)]
enum MockNegotiation {
    Token(String),
    Failure(String),
}

/// A scripted streamed reply.
#[derive(Debug, Clone)]
pub struct MockTurn {
    deltas: Vec<String>,
    refreshed_token: String,
    fault: Option<String>,
}

impl MockTurn {
    /// A reply streamed as the given chunks, refreshing to `token` (empty
    /// string models an omitted refresh header).
    pub fn reply(deltas: &[&str], token: &str) -> Self {
        Self {
            deltas: deltas.iter().map(|s| s.to_string()).collect(),
            refreshed_token: token.to_string(),
            fault: None,
        }
    }

    /// Injects a transport failure after the scripted chunks.
    pub fn with_fault(mut self, message: &str) -> Self {
        self.fault = Some(message.to_string());
        self
    }
}

#[derive(Debug, Clone)]
enum MockTurnOutcome {
    Stream(MockTurn),
    Upstream { status: u16, body: String },
    Network(String),
}

/// One recorded chat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTurn {
    pub model_id: String,
    pub history: Vec<Message>,
    pub token: String,
}

/// Configurable mock for the upstream chat service.
#[derive(Default)]
pub struct MockChatBackend {
    negotiations: Mutex<VecDeque<MockNegotiation>>,
    turns: Mutex<VecDeque<MockTurnOutcome>>,
    negotiation_count: Mutex<usize>,
    recorded: Mutex<Vec<RecordedTurn>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful negotiation yielding `token`.
    pub fn with_session_token(self, token: &str) -> Self {
        self.negotiations
            .lock()
            .unwrap()
            .push_back(MockNegotiation::Token(token.to_string()));
        self
    }

    /// Queues a failed negotiation.
    pub fn with_negotiation_failure(self, message: &str) -> Self {
        self.negotiations
            .lock()
            .unwrap()
            .push_back(MockNegotiation::Failure(message.to_string()));
        self
    }

    /// Queues a streamed turn.
    pub fn with_turn(self, turn: MockTurn) -> Self {
        self.turns
            .lock()
            .unwrap()
            .push_back(MockTurnOutcome::Stream(turn));
        self
    }

    /// Queues a turn that fails before the stream opens.
    pub fn with_turn_error(self, error: BackendError) -> Self {
        let outcome = match error {
            BackendError::Upstream { status, body } => MockTurnOutcome::Upstream { status, body },
            BackendError::Network(message) => MockTurnOutcome::Network(message),
            BackendError::MissingToken => MockTurnOutcome::Network(error.to_string()),
        };
        self.turns.lock().unwrap().push_back(outcome);
        self
    }

    /// Number of negotiation calls made so far.
    pub fn negotiation_count(&self) -> usize {
        *self.negotiation_count.lock().unwrap()
    }

    /// All chat calls made so far, in order.
    pub fn recorded_turns(&self) -> Vec<RecordedTurn> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn negotiate_session(&self) -> Result<SessionToken, BackendError> {
        *self.negotiation_count.lock().unwrap() += 1;

        let scripted = self.negotiations.lock().unwrap().pop_front();
        match scripted {
            Some(MockNegotiation::Token(token)) => Ok(SessionToken::new(token)),
            Some(MockNegotiation::Failure(message)) => Err(BackendError::Network(message)),
            None => Err(BackendError::MissingToken),
        }
    }

    async fn open_turn(
        &self,
        model: ChatModel,
        history: &[Message],
        token: &SessionToken,
    ) -> Result<TurnResponse, BackendError> {
        self.recorded.lock().unwrap().push(RecordedTurn {
            model_id: model.upstream_id().to_string(),
            history: history.to_vec(),
            token: token.as_str().to_string(),
        });

        let scripted = self.turns.lock().unwrap().pop_front();
        match scripted {
            Some(MockTurnOutcome::Stream(turn)) => {
                let mut items: Vec<Result<String, BackendError>> =
                    turn.deltas.into_iter().map(Ok).collect();
                if let Some(fault) = turn.fault {
                    items.push(Err(BackendError::Network(fault)));
                }
                Ok(TurnResponse {
                    refreshed_token: SessionToken::new(turn.refreshed_token),
                    chunks: Box::pin(stream::iter(items)),
                })
            }
            Some(MockTurnOutcome::Upstream { status, body }) => {
                Err(BackendError::Upstream { status, body })
            }
            Some(MockTurnOutcome::Network(message)) => Err(BackendError::Network(message)),
            None => Err(BackendError::Network("no scripted turn".to_string())),
        }
    }
}
