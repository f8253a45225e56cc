//! Realtime transport contract and in-memory implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::conversation::message::MessageRecord;
use crate::core::ids::ConversationId;
use crate::realtime::events::{ConversationStatus, MessageUpdate, TypingEvent};

/// Callback for message-insert push events.
pub type InsertCallback = Box<dyn Fn(MessageRecord) + Send + Sync>;
/// Callback for message-update push events.
pub type UpdateCallback = Box<dyn Fn(MessageUpdate) + Send + Sync>;
/// Callback for conversation-status push events.
pub type StatusCallback = Box<dyn Fn(ConversationStatus) + Send + Sync>;
/// Callback for typing-indicator push events.
pub type TypingCallback = Box<dyn Fn(TypingEvent) + Send + Sync>;

/// Opaque handle to one live subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ChannelHandle(u64);

/// Push-subscription collaborator.
///
/// One subscription observes one conversation; callers own the lifecycle
/// and must unsubscribe the previous handle before re-subscribing.
pub trait RealtimeTransport: Send + Sync {
    /// Subscribe to message inserts and updates for a conversation.
    fn subscribe_messages(
        &self,
        conversation: &ConversationId,
        on_insert: InsertCallback,
        on_update: UpdateCallback,
    ) -> ChannelHandle;

    /// Subscribe to conversation-status changes.
    fn subscribe_status(
        &self,
        conversation: &ConversationId,
        on_change: StatusCallback,
    ) -> ChannelHandle;

    /// Subscribe to the typing indicator.
    fn subscribe_typing(
        &self,
        conversation: &ConversationId,
        on_typing: TypingCallback,
    ) -> ChannelHandle;

    /// Tear a subscription down. Unknown handles are ignored.
    fn unsubscribe(&self, handle: ChannelHandle);
}

enum Subscription {
    Messages {
        conversation: String,
        on_insert: InsertCallback,
        on_update: UpdateCallback,
    },
    Status {
        conversation: String,
        on_change: StatusCallback,
    },
    Typing {
        conversation: String,
        on_typing: TypingCallback,
    },
}

/// In-memory transport for tests and the simulator, with `emit_*` helpers
/// standing in for server-side pushes.
#[derive(Default)]
pub struct InMemoryTransport {
    subscriptions: DashMap<u64, Subscription>,
    next_handle: AtomicU64,
}

impl InMemoryTransport {
    /// Create an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions across all stream types.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Push a message-insert event to matching subscribers.
    pub fn emit_insert(&self, conversation: &ConversationId, record: &MessageRecord) {
        let key = conversation.to_string();
        for entry in self.subscriptions.iter() {
            if let Subscription::Messages {
                conversation,
                on_insert,
                ..
            } = entry.value()
            {
                if *conversation == key {
                    on_insert(record.clone());
                }
            }
        }
    }

    /// Push a message-update event to matching subscribers.
    pub fn emit_update(&self, conversation: &ConversationId, update: &MessageUpdate) {
        let key = conversation.to_string();
        for entry in self.subscriptions.iter() {
            if let Subscription::Messages {
                conversation,
                on_update,
                ..
            } = entry.value()
            {
                if *conversation == key {
                    on_update(update.clone());
                }
            }
        }
    }

    /// Push a status change to matching subscribers.
    pub fn emit_status(&self, conversation: &ConversationId, status: ConversationStatus) {
        let key = conversation.to_string();
        for entry in self.subscriptions.iter() {
            if let Subscription::Status {
                conversation,
                on_change,
            } = entry.value()
            {
                if *conversation == key {
                    on_change(status);
                }
            }
        }
    }

    /// Push a typing event to matching subscribers.
    pub fn emit_typing(&self, conversation: &ConversationId, event: &TypingEvent) {
        let key = conversation.to_string();
        for entry in self.subscriptions.iter() {
            if let Subscription::Typing {
                conversation,
                on_typing,
            } = entry.value()
            {
                if *conversation == key {
                    on_typing(event.clone());
                }
            }
        }
    }

    fn insert(&self, subscription: Subscription) -> ChannelHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.insert(handle, subscription);
        ChannelHandle(handle)
    }
}

impl RealtimeTransport for InMemoryTransport {
    fn subscribe_messages(
        &self,
        conversation: &ConversationId,
        on_insert: InsertCallback,
        on_update: UpdateCallback,
    ) -> ChannelHandle {
        self.insert(Subscription::Messages {
            conversation: conversation.to_string(),
            on_insert,
            on_update,
        })
    }

    fn subscribe_status(
        &self,
        conversation: &ConversationId,
        on_change: StatusCallback,
    ) -> ChannelHandle {
        self.insert(Subscription::Status {
            conversation: conversation.to_string(),
            on_change,
        })
    }

    fn subscribe_typing(
        &self,
        conversation: &ConversationId,
        on_typing: TypingCallback,
    ) -> ChannelHandle {
        self.insert(Subscription::Typing {
            conversation: conversation.to_string(),
            on_typing,
        })
    }

    fn unsubscribe(&self, handle: ChannelHandle) {
        self.subscriptions.remove(&handle.0);
    }
}
