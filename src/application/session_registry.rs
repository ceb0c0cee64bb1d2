//! Session Registry - in-memory map from client identifier to conversation.
//!
//! Single authority for creating and deleting conversations. Creation for a
//! given identifier is atomic without stalling the rest of the registry: the
//! map lock is only held for lookups and inserts, while a per-identifier
//! creation guard serializes concurrent first messages from the same client,
//! so they negotiate exactly one upstream session. Nothing survives a process
//! restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::domain::chat::{ChatError, ChatModel, ClientId, Conversation};
use crate::ports::ChatBackend;

/// A registered conversation plus its idle-eviction bookkeeping.
struct SessionEntry {
    conversation: Arc<Mutex<Conversation>>,
    last_used: StdMutex<Instant>,
}

/// In-memory registry of per-client conversations.
pub struct SessionRegistry {
    backend: Arc<dyn ChatBackend>,
    sessions: RwLock<HashMap<ClientId, SessionEntry>>,
    creating: Mutex<HashMap<ClientId, Arc<Mutex<()>>>>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            sessions: RwLock::new(HashMap::new()),
            creating: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the client's conversation, creating it on first contact.
    ///
    /// Creation negotiates a session token with the upstream service; on
    /// negotiation failure nothing is stored. The negotiation await runs
    /// outside the map lock, so a slow upstream stalls only creators for the
    /// same identifier. The returned handle serializes turns: callers lock it
    /// for the duration of one turn.
    pub async fn get_or_create(
        &self,
        client_id: &ClientId,
        model: ChatModel,
    ) -> Result<Arc<Mutex<Conversation>>, ChatError> {
        if let Some(conversation) = self.lookup(client_id).await {
            return Ok(conversation);
        }

        let guard = {
            let mut creating = self.creating.lock().await;
            Arc::clone(
                creating
                    .entry(client_id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _creation = guard.lock().await;

        // The loser of a creation race lands here after the winner inserted.
        if let Some(conversation) = self.lookup(client_id).await {
            self.finish_creation(client_id).await;
            return Ok(conversation);
        }

        let token = match self.backend.negotiate_session().await {
            Ok(token) => token,
            Err(err) => {
                self.finish_creation(client_id).await;
                return Err(ChatError::UpstreamUnavailable(err.to_string()));
            }
        };

        info!(client = %client_id, model = %model, "created chat session");
        let conversation = Arc::new(Mutex::new(Conversation::new(token, model)));
        self.sessions.write().await.insert(
            client_id.clone(),
            SessionEntry {
                conversation: Arc::clone(&conversation),
                last_used: StdMutex::new(Instant::now()),
            },
        );
        self.finish_creation(client_id).await;

        Ok(conversation)
    }

    /// Fast path: read-locked lookup, refreshing the idle clock on a hit.
    async fn lookup(&self, client_id: &ClientId) -> Option<Arc<Mutex<Conversation>>> {
        let sessions = self.sessions.read().await;
        sessions.get(client_id).map(|entry| {
            *entry.last_used.lock().unwrap() = Instant::now();
            Arc::clone(&entry.conversation)
        })
    }

    /// Refreshes the idle clock for the client's session, if present.
    pub async fn touch(&self, client_id: &ClientId) {
        self.lookup(client_id).await;
    }

    async fn finish_creation(&self, client_id: &ClientId) {
        self.creating.lock().await.remove(client_id);
    }

    /// Removes the client's conversation. Returns whether one existed.
    pub async fn delete(&self, client_id: &ClientId) -> bool {
        let removed = self.sessions.write().await.remove(client_id).is_some();
        if removed {
            info!(client = %client_id, "deleted chat session");
        }
        removed
    }

    /// Drops sessions idle for longer than `max_idle`. Returns the number of
    /// evicted sessions.
    ///
    /// A conversation whose lock is held has a turn in flight and is never
    /// evicted, regardless of how long ago it was last resolved.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.conversation.try_lock().is_err()
                || entry.last_used.lock().unwrap().elapsed() <= max_idle
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "evicted idle chat sessions");
        }
        evicted
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
