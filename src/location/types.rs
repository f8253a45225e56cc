//! Location detection result types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A physical/business location a chat can be scoped to.
///
/// Produced by the resolver; read-only to consumers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DetectedLocation {
    /// Directory row identifier.
    pub id: String,
    /// Display name shown in the widget header and picker.
    pub name: String,
    /// Site slug, when the location maps to a page on the embedding site.
    pub slug: Option<String>,
    /// City, for picker grouping.
    pub city: Option<String>,
    /// State/region, for picker grouping.
    pub state: Option<String>,
}

impl DetectedLocation {
    /// Whether a stored record is usable: persisted selections from older
    /// widget versions may be missing fields and are then discarded.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

/// Which strategy produced a resolved location.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Restored from (or persisted by) an explicit visitor choice.
    UserSelected,
    /// Externally supplied slug on the embed tag.
    Explicit,
    /// Matched a known URL path shape on the parent page.
    UrlPattern,
    /// Resolved through the embedding site's API.
    SiteApi,
}

impl DetectionMethod {
    /// Stable string form for analytics payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserSelected => "user_selected",
            Self::Explicit => "explicit",
            Self::UrlPattern => "url_pattern",
            Self::SiteApi => "wordpress_api",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location together with the strategy that found it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// The detected location.
    pub location: DetectedLocation,
    /// The strategy that produced it.
    pub method: DetectionMethod,
}
