//! Realtime stream adapters and the transport they subscribe through.

pub mod events;
pub mod messages;
pub mod status;
pub mod transport;
pub mod typing;

pub use events::{ConversationEvent, ConversationStatus, MessageUpdate, TypingEvent};
pub use messages::MessageStreamAdapter;
pub use status::StatusStreamAdapter;
pub use transport::{ChannelHandle, InMemoryTransport, RealtimeTransport};
pub use typing::TypingStreamAdapter;
