//! Read-only location directory queries.

use std::future::Future;
use std::pin::Pin;

use crate::core::errors::WidgetResult;
use crate::core::ids::AgentKey;
use crate::location::types::DetectedLocation;

/// Boxed future type for directory queries.
pub type DirectoryFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote directory of an agent's active locations.
///
/// Queries are read-only and scoped to the agent and "active" status; the
/// backing table and its row-level security live outside this crate.
pub trait LocationDirectory: Send + Sync {
    /// All active locations for the agent, picker-ordered.
    ///
    /// # Errors
    /// Returns an error if the remote query fails.
    fn active_locations(
        &self,
        agent: &AgentKey,
    ) -> DirectoryFuture<'_, WidgetResult<Vec<DetectedLocation>>>;

    /// Exact-match lookup by site slug among the agent's active locations.
    ///
    /// # Errors
    /// Returns an error if the remote query fails.
    fn find_by_slug(
        &self,
        agent: &AgentKey,
        slug: &str,
    ) -> DirectoryFuture<'_, WidgetResult<Option<DetectedLocation>>>;
}

/// Fixed in-memory directory for tests and the simulator.
#[derive(Clone, Debug, Default)]
pub struct StaticLocationDirectory {
    locations: Vec<DetectedLocation>,
}

impl StaticLocationDirectory {
    /// Create a directory over a fixed location list.
    #[must_use]
    pub fn new(locations: Vec<DetectedLocation>) -> Self {
        Self { locations }
    }
}

impl LocationDirectory for StaticLocationDirectory {
    fn active_locations(
        &self,
        _agent: &AgentKey,
    ) -> DirectoryFuture<'_, WidgetResult<Vec<DetectedLocation>>> {
        let locations = self.locations.clone();
        Box::pin(async move { Ok(locations) })
    }

    fn find_by_slug(
        &self,
        _agent: &AgentKey,
        slug: &str,
    ) -> DirectoryFuture<'_, WidgetResult<Option<DetectedLocation>>> {
        let found = self
            .locations
            .iter()
            .find(|location| location.slug.as_deref() == Some(slug))
            .cloned();
        Box::pin(async move { Ok(found) })
    }
}
