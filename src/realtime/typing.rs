//! Typing-indicator stream adapter.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::ids::ConversationId;
use crate::realtime::events::ConversationEvent;
use crate::realtime::transport::{ChannelHandle, RealtimeTransport};

/// Forwards typing-indicator pushes as [`ConversationEvent::Typing`].
pub struct TypingStreamAdapter {
    transport: Arc<dyn RealtimeTransport>,
    events: mpsc::UnboundedSender<ConversationEvent>,
    handle: Mutex<Option<ChannelHandle>>,
}

impl TypingStreamAdapter {
    /// Create a detached adapter.
    #[must_use]
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        events: mpsc::UnboundedSender<ConversationEvent>,
    ) -> Self {
        Self {
            transport,
            events,
            handle: Mutex::new(None),
        }
    }

    /// Subscribe to a conversation's typing stream, replacing any previous
    /// subscription. Local placeholder ids are a no-op.
    pub fn attach(&self, conversation: &ConversationId) {
        self.detach();
        if !conversation.is_canonical() {
            debug!("skipping typing stream for non-canonical id {conversation}");
            return;
        }

        let events = self.events.clone();
        let handle = self.transport.subscribe_typing(
            conversation,
            Box::new(move |event| {
                let _ = events.send(ConversationEvent::Typing(event));
            }),
        );
        *self.lock_handle() = Some(handle);
    }

    /// Tear down the live subscription, if any.
    pub fn detach(&self) {
        if let Some(handle) = self.lock_handle().take() {
            self.transport.unsubscribe(handle);
        }
    }

    /// Whether a subscription is currently live.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.lock_handle().is_some()
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<ChannelHandle>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for TypingStreamAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}
