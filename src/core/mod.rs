//! Core vocabulary shared by every widget subsystem.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::WidgetConfig;
pub use errors::{WidgetError, WidgetResult};
pub use ids::{AgentKey, ConversationId};
