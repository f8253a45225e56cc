//! Conversation state: the canonical message timeline and its side effects.

pub mod backend;
pub mod effects;
pub mod manager;
pub mod message;
pub mod model;

pub use backend::{ConversationBackend, InMemoryBackend, MarkReadOutcome, TakeoverAgent};
pub use effects::{ScrollBehavior, View, WidgetEffect};
pub use manager::ConversationManager;
pub use message::{LinkPreview, Message, MessageMetadata, MessageRecord, MessageRole, Reaction};
pub use model::Conversation;
