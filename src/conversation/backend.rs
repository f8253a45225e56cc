//! Backend contract for conversation history and read receipts.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::conversation::message::{MessageRecord, MessageRole};
use crate::core::errors::{WidgetError, WidgetResult};
use crate::core::ids::ConversationId;

/// Boxed future type for backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a mark-read call.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MarkReadOutcome {
    /// Whether the backend accepted the call.
    pub success: bool,
    /// Number of rows flipped to read.
    pub updated: u64,
}

/// Display identity of the human agent handling a takeover.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TakeoverAgent {
    /// Display name.
    pub name: String,
    /// Avatar URL, when set.
    pub avatar: Option<String>,
}

/// Conversation persistence collaborator.
///
/// Implementations wrap the hosted backend; every operation is valid only
/// for canonical conversation ids and implementations may reject local ids
/// with [`WidgetError::NotCanonical`].
pub trait ConversationBackend: Send + Sync {
    /// Fetch full message history for a conversation.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn fetch_messages(
        &self,
        conversation: &ConversationId,
    ) -> BackendFuture<'_, WidgetResult<Vec<MessageRecord>>>;

    /// Mark unread messages authored by the other side as read.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn mark_messages_read(
        &self,
        conversation: &ConversationId,
        reader: MessageRole,
    ) -> BackendFuture<'_, WidgetResult<MarkReadOutcome>>;

    /// Display identity of the human agent who has taken the conversation
    /// over, if any.
    ///
    /// # Errors
    /// Returns an error if the remote call fails.
    fn fetch_takeover_agent(
        &self,
        conversation: &ConversationId,
    ) -> BackendFuture<'_, WidgetResult<Option<TakeoverAgent>>>;
}

/// In-memory backend for tests and the simulator.
///
/// Counts calls so tests can assert the one-shot history fetch and the
/// debounced read-receipt behavior.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    histories: DashMap<String, Vec<MessageRecord>>,
    takeover_agent: Mutex<Option<TakeoverAgent>>,
    fetch_calls: AtomicUsize,
    mark_read_calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed history rows for a conversation.
    pub fn seed_history(&self, conversation: &ConversationId, records: Vec<MessageRecord>) {
        self.histories.insert(conversation.to_string(), records);
    }

    /// Set the agent returned by takeover lookups.
    pub fn set_takeover_agent(&self, agent: Option<TakeoverAgent>) {
        match self.takeover_agent.lock() {
            Ok(mut guard) => *guard = agent,
            Err(mut poisoned) => **poisoned.get_mut() = agent,
        }
    }

    /// Number of history fetches served.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of mark-read calls served.
    #[must_use]
    pub fn mark_read_calls(&self) -> usize {
        self.mark_read_calls.load(Ordering::SeqCst)
    }
}

impl ConversationBackend for InMemoryBackend {
    fn fetch_messages(
        &self,
        conversation: &ConversationId,
    ) -> BackendFuture<'_, WidgetResult<Vec<MessageRecord>>> {
        let key = conversation.to_string();
        let canonical = conversation.is_canonical();
        Box::pin(async move {
            if !canonical {
                return Err(WidgetError::NotCanonical(key));
            }
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .histories
                .get(&key)
                .map(|entry| entry.value().clone())
                .unwrap_or_default())
        })
    }

    fn mark_messages_read(
        &self,
        conversation: &ConversationId,
        _reader: MessageRole,
    ) -> BackendFuture<'_, WidgetResult<MarkReadOutcome>> {
        let key = conversation.to_string();
        let canonical = conversation.is_canonical();
        Box::pin(async move {
            if !canonical {
                return Err(WidgetError::NotCanonical(key));
            }
            self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
            let updated = self
                .histories
                .get(&key)
                .map(|entry| entry.value().len() as u64)
                .unwrap_or_default();
            Ok(MarkReadOutcome {
                success: true,
                updated,
            })
        })
    }

    fn fetch_takeover_agent(
        &self,
        conversation: &ConversationId,
    ) -> BackendFuture<'_, WidgetResult<Option<TakeoverAgent>>> {
        let key = conversation.to_string();
        let canonical = conversation.is_canonical();
        Box::pin(async move {
            if !canonical {
                return Err(WidgetError::NotCanonical(key));
            }
            let agent = match self.takeover_agent.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            Ok(agent)
        })
    }
}
