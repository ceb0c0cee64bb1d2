//! Chat Service - executes one request/response turn per client.
//!
//! The turn protocol, per conversation:
//!
//! 1. append the user message to history;
//! 2. send `{model, messages}` authenticated with the current session token;
//! 3. consume the streamed reply, forwarding chunks to the caller's channel;
//! 4. rotate tokens from the response's refresh header and append the
//!    aggregated assistant message.
//!
//! The conversation's lock is held from before the request until the turn is
//! committed, so at most one turn per client is in flight; a concurrent
//! request for the same client queues behind it. A turn that fails before the
//! response opens leaves the already-appended user message in history, which
//! matches the upstream contract this gateway wraps.

use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::OwnedMutexGuard;
use tracing::{error, warn};

use crate::domain::chat::{ChatError, ChatModel, ClientId, Conversation};
use crate::ports::{ChatBackend, TurnResponse};

use super::session_registry::SessionRegistry;

/// Buffered chunks between the turn consumer and a slow reader.
const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// Orchestrates conversations: session resolution plus the turn protocol.
pub struct ChatService {
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn ChatBackend>,
}

impl ChatService {
    pub fn new(registry: Arc<SessionRegistry>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs one turn and returns the full aggregated assistant reply.
    pub async fn send_message(
        &self,
        client_id: &ClientId,
        alias: &str,
        text: &str,
    ) -> Result<String, ChatError> {
        let mut chunks = self.open_stream(client_id, alias, text).await?;

        let mut reply = String::new();
        while let Some(chunk) = chunks.recv().await {
            reply.push_str(&chunk);
        }
        Ok(reply)
    }

    /// Opens one turn and returns a channel of incremental reply chunks.
    ///
    /// Session resolution, model validation, and the initial upstream exchange
    /// happen before this returns, so their failures surface as plain errors.
    /// The turn itself then runs to completion on a background task: it keeps
    /// consuming and commits the conversation even if the receiver hangs up.
    pub async fn open_stream(
        &self,
        client_id: &ClientId,
        alias: &str,
        text: &str,
    ) -> Result<Receiver<String>, ChatError> {
        let model = ChatModel::from_alias(alias)
            .ok_or_else(|| ChatError::InvalidModel(alias.to_string()))?;

        let conversation = self.registry.get_or_create(client_id, model).await?;
        let mut conversation = conversation.lock_owned().await;

        if !conversation.can_take_turn() {
            return Err(ChatError::UpstreamUnavailable(
                "session token was not refreshed by the previous turn; delete the session and retry"
                    .to_string(),
            ));
        }

        conversation.push_user(text);

        let turn = self
            .backend
            .open_turn(
                conversation.model(),
                conversation.history(),
                conversation.current_token(),
            )
            .await
            .map_err(|err| {
                error!(client = %client_id, error = %err, "chat turn failed to open");
                ChatError::from(err)
            })?;

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        tokio::spawn(consume_turn(
            Arc::clone(&self.registry),
            client_id.clone(),
            conversation,
            turn,
            tx,
        ));
        Ok(rx)
    }

    /// Deletes the client's conversation. Returns whether one existed.
    pub async fn end_conversation(&self, client_id: &ClientId) -> bool {
        self.registry.delete(client_id).await
    }
}

/// Drains the reply stream, then commits the turn.
///
/// Holds the conversation guard for the whole consumption, releasing it only
/// after tokens are rotated and the assistant message is recorded. A transport
/// failure mid-stream ends consumption and commits the partial reply. The
/// commit refreshes the session's idle clock, so a long streamed turn does not
/// count as idle time.
async fn consume_turn(
    registry: Arc<SessionRegistry>,
    client_id: ClientId,
    mut conversation: OwnedMutexGuard<Conversation>,
    turn: TurnResponse,
    tx: Sender<String>,
) {
    use futures::StreamExt;

    let TurnResponse {
        refreshed_token,
        mut chunks,
    } = turn;

    let mut reply = String::new();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(delta) => {
                reply.push_str(&delta);
                // A dropped receiver must not abort the turn; history still
                // gets the full reply.
                let _ = tx.send(delta).await;
            }
            Err(err) => {
                warn!(error = %err, "chat stream ended early; committing partial reply");
                break;
            }
        }
    }

    conversation.complete_turn(reply, refreshed_token);
    registry.touch(&client_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::upstream::{MockChatBackend, MockTurn};
    use crate::domain::chat::{Message, Role};
    use crate::ports::BackendError;

    fn client(id: &str) -> ClientId {
        ClientId::new(id).unwrap()
    }

    fn service(backend: Arc<MockChatBackend>) -> ChatService {
        let registry = Arc::new(SessionRegistry::new(backend.clone()));
        ChatService::new(registry, backend)
    }

    #[tokio::test]
    async fn full_turn_scenario() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["Hi", " there"], "T2")),
        );
        let service = service(backend.clone());
        let alice = client("alice");

        let reply = service.send_message(&alice, "llama", "hello").await.unwrap();
        assert_eq!(reply, "Hi there");

        // The outbound request carried the negotiated token, the resolved
        // model identifier, and the history including the new user message.
        let requests = backend.recorded_turns();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].token, "T1");
        assert_eq!(
            requests[0].model_id,
            "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo"
        );
        assert_eq!(requests[0].history, vec![Message::user("hello")]);

        // Conversation state after the turn.
        let conversation = service
            .registry()
            .get_or_create(&alice, ChatModel::Llama)
            .await
            .unwrap();
        let conversation = conversation.lock().await;
        assert_eq!(conversation.previous_token().as_str(), "T1");
        assert_eq!(conversation.current_token().as_str(), "T2");
        assert_eq!(
            conversation.history(),
            &[Message::user("hello"), Message::assistant("Hi there")]
        );
    }

    #[tokio::test]
    async fn history_alternates_after_multiple_turns() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["one"], "T2"))
                .with_turn(MockTurn::reply(&["two"], "T3"))
                .with_turn(MockTurn::reply(&["three"], "T4")),
        );
        let service = service(backend.clone());
        let alice = client("alice");

        for text in ["a", "b", "c"] {
            service.send_message(&alice, "llama", text).await.unwrap();
        }

        let conversation = service
            .registry()
            .get_or_create(&alice, ChatModel::Llama)
            .await
            .unwrap();
        let conversation = conversation.lock().await;
        assert_eq!(conversation.history().len(), 6);
        for (i, message) in conversation.history().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
        assert_eq!(conversation.current_token().as_str(), "T4");

        // Each turn authenticated with the token refreshed by the one before.
        let tokens: Vec<_> = backend
            .recorded_turns()
            .into_iter()
            .map(|turn| turn.token)
            .collect();
        assert_eq!(tokens, vec!["T1", "T2", "T3"]);
    }

    #[tokio::test]
    async fn empty_chunks_do_not_reach_the_reply() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["Hi", "", " there"], "T2")),
        );
        let service = service(backend);

        let reply = service
            .send_message(&client("alice"), "llama", "hello")
            .await
            .unwrap();
        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn invalid_alias_fails_before_touching_the_registry() {
        let backend = Arc::new(MockChatBackend::new());
        let service = service(backend.clone());

        let result = service
            .send_message(&client("alice"), "gpt-12", "hello")
            .await;

        assert!(matches!(result, Err(ChatError::InvalidModel(alias)) if alias == "gpt-12"));
        assert_eq!(backend.negotiation_count(), 0);
        assert!(service.registry().is_empty().await);
    }

    #[tokio::test]
    async fn upstream_error_keeps_the_user_message() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn_error(BackendError::Upstream {
                    status: 429,
                    body: "too many requests".to_string(),
                }),
        );
        let service = service(backend);
        let alice = client("alice");

        let result = service.send_message(&alice, "llama", "hello").await;
        assert!(
            matches!(&result, Err(ChatError::Upstream { status: 429, body }) if body == "too many requests")
        );

        // The appended user message is not rolled back on turn failure.
        let conversation = service
            .registry()
            .get_or_create(&alice, ChatModel::Llama)
            .await
            .unwrap();
        let conversation = conversation.lock().await;
        assert_eq!(conversation.history(), &[Message::user("hello")]);
        assert_eq!(conversation.current_token().as_str(), "T1");
    }

    #[tokio::test]
    async fn mid_stream_fault_commits_partial_reply() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["par"], "T2").with_fault("connection reset")),
        );
        let service = service(backend);
        let alice = client("alice");

        let reply = service.send_message(&alice, "llama", "hello").await.unwrap();
        assert_eq!(reply, "par");

        let conversation = service
            .registry()
            .get_or_create(&alice, ChatModel::Llama)
            .await
            .unwrap();
        let conversation = conversation.lock().await;
        assert_eq!(conversation.current_token().as_str(), "T2");
        assert_eq!(conversation.history().len(), 2);
    }

    #[tokio::test]
    async fn degraded_session_rejects_further_turns() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                // Upstream omits the refresh header.
                .with_turn(MockTurn::reply(&["hi"], "")),
        );
        let service = service(backend);
        let alice = client("alice");

        service.send_message(&alice, "llama", "hello").await.unwrap();
        let result = service.send_message(&alice, "llama", "again").await;

        assert!(matches!(result, Err(ChatError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn open_stream_delivers_chunks_incrementally() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["Hi", " there"], "T2")),
        );
        let service = service(backend);

        let mut chunks = service
            .open_stream(&client("alice"), "llama", "hello")
            .await
            .unwrap();

        assert_eq!(chunks.recv().await.as_deref(), Some("Hi"));
        assert_eq!(chunks.recv().await.as_deref(), Some(" there"));
        assert_eq!(chunks.recv().await, None);
    }

    #[tokio::test]
    async fn dropped_receiver_still_commits_the_turn() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["Hi", " there"], "T2")),
        );
        let service = service(backend);
        let alice = client("alice");

        let chunks = service.open_stream(&alice, "llama", "hello").await.unwrap();
        drop(chunks);

        // Re-acquiring the conversation lock waits for the turn to commit.
        let conversation = service
            .registry()
            .get_or_create(&alice, ChatModel::Llama)
            .await
            .unwrap();
        let conversation = conversation.lock().await;
        assert_eq!(
            conversation.history(),
            &[Message::user("hello"), Message::assistant("Hi there")]
        );
        assert_eq!(conversation.current_token().as_str(), "T2");
    }

    #[tokio::test]
    async fn end_conversation_reports_presence() {
        let backend = Arc::new(
            MockChatBackend::new()
                .with_session_token("T1")
                .with_turn(MockTurn::reply(&["hi"], "T2")),
        );
        let service = service(backend);
        let alice = client("alice");

        assert!(!service.end_conversation(&alice).await);
        service.send_message(&alice, "llama", "hello").await.unwrap();
        assert!(service.end_conversation(&alice).await);
        assert!(!service.end_conversation(&alice).await);
    }
}
