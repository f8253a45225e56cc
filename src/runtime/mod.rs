//! Widget runtime facade: wires identity, location detection, conversation
//! state, and the realtime streams to one active conversation id.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::content::{detect_entry_type, parse_utm_params, ContentSanitizer, EntryType, UtmParams};
use crate::conversation::backend::ConversationBackend;
use crate::conversation::effects::{View, WidgetEffect};
use crate::conversation::manager::ConversationManager;
use crate::conversation::message::Message;
use crate::conversation::model::Conversation;
use crate::core::config::WidgetConfig;
use crate::core::errors::WidgetResult;
use crate::core::ids::ConversationId;
use crate::location::directory::LocationDirectory;
use crate::location::resolver::LocationResolver;
use crate::location::types::{DetectedLocation, ResolvedLocation};
use crate::realtime::events::ConversationEvent;
use crate::realtime::messages::MessageStreamAdapter;
use crate::realtime::status::StatusStreamAdapter;
use crate::realtime::transport::RealtimeTransport;
use crate::realtime::typing::TypingStreamAdapter;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;

/// Collaborator implementations injected per widget instance.
///
/// No module-level singletons: every embedded widget owns its dependencies
/// and disposes of them with the runtime.
pub struct WidgetBackends {
    /// Durable client-side storage.
    pub storage: Arc<dyn KeyValueStore>,
    /// Conversation persistence collaborator.
    pub backend: Arc<dyn ConversationBackend>,
    /// Push-subscription transport.
    pub transport: Arc<dyn RealtimeTransport>,
    /// Location directory.
    pub directory: Arc<dyn LocationDirectory>,
}

/// One embedded widget instance.
pub struct WidgetRuntime {
    config: WidgetConfig,
    session: SessionStore,
    sanitizer: ContentSanitizer,
    resolver: LocationResolver,
    manager: Arc<ConversationManager>,
    message_stream: MessageStreamAdapter,
    typing_stream: TypingStreamAdapter,
    status_stream: StatusStreamAdapter,
    location: Mutex<Option<ResolvedLocation>>,
    session_id: String,
    visitor_id: String,
    pump: JoinHandle<()>,
}

impl WidgetRuntime {
    /// Build a runtime and the effect channel its host UI drains.
    ///
    /// Visitor and session identifiers are created (or restored) here, so a
    /// runtime is always attributable from the first event.
    ///
    /// # Errors
    /// Returns an error if configuration is invalid or a component cannot
    /// be constructed.
    pub fn new(
        config: WidgetConfig,
        backends: WidgetBackends,
    ) -> WidgetResult<(Self, mpsc::UnboundedReceiver<WidgetEffect>)> {
        config.validate()?;

        let session = SessionStore::new(Arc::clone(&backends.storage));
        let session_id = session.get_or_create_session_id();
        let visitor_id = session.get_or_create_visitor_id(&config.agent);

        let sanitizer = ContentSanitizer::new()?;
        let resolver = LocationResolver::new(
            &config,
            Arc::clone(&backends.storage),
            Arc::clone(&backends.directory),
        )?;

        let (manager, effects_rx) = ConversationManager::new(
            config.clone(),
            Arc::clone(&backends.storage),
            Arc::clone(&backends.backend),
        );
        let manager = Arc::new(manager);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ConversationEvent>();
        let message_stream =
            MessageStreamAdapter::new(Arc::clone(&backends.transport), events_tx.clone());
        let typing_stream =
            TypingStreamAdapter::new(Arc::clone(&backends.transport), events_tx.clone());
        let status_stream = StatusStreamAdapter::new(Arc::clone(&backends.transport), events_tx);

        let pump_manager = Arc::clone(&manager);
        let pump = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                pump_manager.handle_event(event).await;
            }
        });

        info!("widget runtime created for agent {}", config.agent);
        Ok((
            Self {
                config,
                session,
                sanitizer,
                resolver,
                manager,
                message_stream,
                typing_stream,
                status_stream,
                location: Mutex::new(None),
                session_id,
                visitor_id,
                pump,
            },
            effects_rx,
        ))
    }

    /// Mount the widget: restore persisted conversation state, re-attach
    /// the realtime streams, and run location detection.
    pub async fn start(&self) {
        self.manager.restore().await;
        if let Some(active) = self.manager.active_conversation() {
            self.attach_streams(&active);
        }
        let _ = self.resolve_location().await;
    }

    /// Make a conversation active and move all three streams to it.
    pub async fn set_active_conversation(&self, id: ConversationId) {
        self.manager.activate(id.clone()).await;
        self.attach_streams(&id);
    }

    /// Replace the active local placeholder with the backend-issued id and
    /// bring the realtime streams up for it.
    ///
    /// # Errors
    /// Returns an error if the replacement id is not canonical.
    pub fn promote_conversation(&self, canonical: ConversationId) -> WidgetResult<()> {
        self.manager.promote_conversation(canonical.clone())?;
        self.attach_streams(&canonical);
        Ok(())
    }

    /// Append a message from the local send path (visitor input or the AI
    /// reply the chat endpoint returned).
    pub fn append_local_message(&self, message: Message) {
        self.manager.append_message(message);
    }

    /// Widget opened.
    pub fn open(&self) {
        self.manager.set_widget_open(true);
    }

    /// Widget closed.
    pub fn close(&self) {
        self.manager.set_widget_open(false);
    }

    /// The visitor switched surfaces.
    pub fn set_view(&self, view: View) {
        self.manager.set_view(view);
    }

    /// Re-run location detection. Runs are not cancelled; the latest
    /// completion wins.
    pub async fn resolve_location(&self) -> Option<ResolvedLocation> {
        let resolved = self
            .resolver
            .resolve(
                self.config.page_url.as_deref(),
                self.config.location_override.as_deref(),
            )
            .await;
        *self.lock_location() = resolved.clone();
        resolved
    }

    /// Persist a manual picker choice and adopt it as the detected location.
    pub fn select_location(&self, location: &DetectedLocation) -> ResolvedLocation {
        let resolved = self.resolver.select_location(location);
        *self.lock_location() = Some(resolved.clone());
        resolved
    }

    /// Active locations for the manual picker.
    pub async fn picker_locations(&self) -> Vec<DetectedLocation> {
        self.resolver.picker_locations().await
    }

    /// Tear down owned background work and subscriptions.
    pub fn dispose(&self) {
        self.message_stream.detach();
        self.typing_stream.detach();
        self.status_stream.detach();
        self.manager.dispose();
        self.pump.abort();
    }

    // ----- state exposed to the host UI -----

    /// Current timeline of the active conversation.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.manager.messages()
    }

    /// Conversation list, most recent first.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.manager.conversations()
    }

    /// Active conversation id.
    #[must_use]
    pub fn active_conversation(&self) -> Option<ConversationId> {
        self.manager.active_conversation()
    }

    /// Whether a human agent is typing.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.manager.is_typing()
    }

    /// Whether a human takeover is in effect.
    #[must_use]
    pub fn takeover_active(&self) -> bool {
        self.manager.takeover_active()
    }

    /// Display identity of the takeover agent, when known.
    #[must_use]
    pub fn takeover_agent(&self) -> Option<crate::conversation::backend::TakeoverAgent> {
        self.manager.takeover_agent()
    }

    /// Detected location, when any strategy matched.
    #[must_use]
    pub fn location(&self) -> Option<ResolvedLocation> {
        self.lock_location().clone()
    }

    /// Whether the manual picker should be offered.
    #[must_use]
    pub fn picker_visible(&self) -> bool {
        self.lock_location().is_none()
    }

    /// The content sanitizer, applied by the host at render time.
    #[must_use]
    pub const fn sanitizer(&self) -> &ContentSanitizer {
        &self.sanitizer
    }

    /// Traffic-source classification of the configured referrer.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        detect_entry_type(self.config.referrer.as_deref())
    }

    /// UTM attribution of the configured page URL.
    #[must_use]
    pub fn utm_params(&self) -> UtmParams {
        self.config
            .page_url
            .as_deref()
            .map(parse_utm_params)
            .unwrap_or_default()
    }

    /// Cross-reload session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Per-agent visitor identifier.
    #[must_use]
    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    /// The session store, for hosts that track extra per-visitor flags.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    fn attach_streams(&self, conversation: &ConversationId) {
        self.message_stream.attach(conversation);
        self.typing_stream.attach(conversation);
        self.status_stream.attach(conversation);
    }

    fn lock_location(&self) -> MutexGuard<'_, Option<ResolvedLocation>> {
        match self.location.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for WidgetRuntime {
    fn drop(&mut self) {
        self.dispose();
    }
}
