//! Side effects the runtime asks the host UI to perform.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Which widget surface the visitor is looking at.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Landing surface: greeting, conversation list, picker.
    #[default]
    Home,
    /// The active conversation timeline.
    Messages,
}

/// How the host should scroll the timeline to the bottom.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    /// Jump without animation; used the first time a conversation is shown.
    Instant,
    /// Animated scroll for subsequent changes.
    Smooth,
}

/// An imperative effect for the host UI to apply after its next paint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "effect")]
pub enum WidgetEffect {
    /// Scroll the timeline to its bottom.
    ScrollToBottom {
        /// Scroll animation mode.
        behavior: ScrollBehavior,
    },
    /// Play the new-message notification sound.
    PlayNotificationSound,
}

/// Create the effect channel the host UI drains.
#[must_use]
pub fn effect_channel() -> (
    mpsc::UnboundedSender<WidgetEffect>,
    mpsc::UnboundedReceiver<WidgetEffect>,
) {
    mpsc::unbounded_channel()
}
