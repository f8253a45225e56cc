//! Priority-ordered location detection.
//!
//! Strategies run in strict order; the first to yield a location wins:
//!
//! 1. stored visitor selection (terminal when present and well-formed),
//! 2. explicit override slug from the embed tag,
//! 3. URL path pattern match against the parent page,
//! 4. assisted site-API lookup for a captured-but-unmatched slug,
//! 5. nothing — the picker affordance takes over.
//!
//! Overlapping runs are not cancelled; a stale run's result may land after
//! a newer one and callers must tolerate last-writer-wins.

use std::sync::Arc;

use regex::Regex;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::core::config::WidgetConfig;
use crate::core::errors::WidgetResult;
use crate::core::ids::AgentKey;
use crate::location::directory::LocationDirectory;
use crate::location::site_api::SiteApiClient;
use crate::location::types::{DetectedLocation, DetectionMethod, ResolvedLocation};
use crate::storage::{keys, KeyValueStore};

/// Location detection over the strategy chain.
pub struct LocationResolver {
    agent: AgentKey,
    storage: Arc<dyn KeyValueStore>,
    directory: Arc<dyn LocationDirectory>,
    site_api: Option<SiteApiClient>,
    site_api_timeout: std::time::Duration,
    path_patterns: Vec<Regex>,
}

impl LocationResolver {
    /// Build a resolver from widget configuration.
    ///
    /// # Errors
    /// Returns an error if a path pattern fails to compile or the site API
    /// client cannot be constructed.
    pub fn new(
        config: &WidgetConfig,
        storage: Arc<dyn KeyValueStore>,
        directory: Arc<dyn LocationDirectory>,
    ) -> WidgetResult<Self> {
        let site_api = match &config.site_api_base {
            Some(base) => Some(SiteApiClient::new(base, config.site_api_timeout)?),
            None => None,
        };

        // Ordered: the first capturing match wins.
        let path_patterns = vec![
            Regex::new(r"^/community/([a-z0-9-]+)/?")?,
            Regex::new(r"^/locations?/([a-z0-9-]+)/?")?,
            Regex::new(r"^/([a-z0-9-]+)/homes/?")?,
        ];

        Ok(Self {
            agent: config.agent.clone(),
            storage,
            directory,
            site_api,
            site_api_timeout: config.site_api_timeout,
            path_patterns,
        })
    }

    /// Run the strategy chain. `None` means no strategy matched and the
    /// manual picker should become available.
    pub async fn resolve(
        &self,
        page_url: Option<&str>,
        override_slug: Option<&str>,
    ) -> Option<ResolvedLocation> {
        // 1. A previously stored visitor choice short-circuits everything.
        if let Some(stored) = self.stored_selection() {
            debug!("location restored from stored selection: {}", stored.name);
            return Some(ResolvedLocation {
                location: stored,
                method: DetectionMethod::UserSelected,
            });
        }

        // 2. Explicit override from the embedding page.
        if let Some(slug) = override_slug {
            if let Some(location) = self.lookup_slug(slug).await {
                debug!("location resolved from explicit override: {}", location.name);
                return Some(ResolvedLocation {
                    location,
                    method: DetectionMethod::Explicit,
                });
            }
        }

        // 3. URL path pattern match.
        let candidate_slug = page_url.and_then(|url| self.slug_from_url(url));
        if let Some(slug) = &candidate_slug {
            if let Some(location) = self.lookup_slug(slug).await {
                debug!("location resolved from url pattern: {}", location.name);
                return Some(ResolvedLocation {
                    location,
                    method: DetectionMethod::UrlPattern,
                });
            }
        }

        // 4. Assisted lookup, only for a captured slug with no direct match.
        if let (Some(slug), Some(site_api)) = (candidate_slug, &self.site_api) {
            let lookup = timeout(self.site_api_timeout, site_api.community_slug_for_home(&slug));
            let community = match lookup.await {
                Ok(result) => result,
                Err(_) => {
                    warn!("site api lookup timed out for {slug}");
                    None
                }
            };
            if let Some(community_slug) = community {
                if let Some(location) = self.lookup_slug(&community_slug).await {
                    debug!("location resolved via site api: {}", location.name);
                    return Some(ResolvedLocation {
                        location,
                        method: DetectionMethod::SiteApi,
                    });
                }
            }
        }

        // 5. No detection; the picker takes over.
        None
    }

    /// All active locations for the agent, for the manual picker.
    pub async fn picker_locations(&self) -> Vec<DetectedLocation> {
        match self.directory.active_locations(&self.agent).await {
            Ok(locations) => locations,
            Err(err) => {
                warn!("location directory query failed: {err}");
                Vec::new()
            }
        }
    }

    /// Persist an explicit visitor choice for this and future visits.
    pub fn select_location(&self, location: &DetectedLocation) -> ResolvedLocation {
        match serde_json::to_string(location) {
            Ok(json) => self.storage.put(&keys::location(&self.agent), &json),
            Err(err) => warn!("failed to persist location selection: {err}"),
        }
        ResolvedLocation {
            location: location.clone(),
            method: DetectionMethod::UserSelected,
        }
    }

    /// Forget the stored visitor choice.
    pub fn clear_selection(&self) {
        self.storage.remove(&keys::location(&self.agent));
    }

    /// The stored visitor choice, discarding malformed records.
    #[must_use]
    pub fn stored_selection(&self) -> Option<DetectedLocation> {
        let raw = self.storage.get(&keys::location(&self.agent))?;
        let location: DetectedLocation = serde_json::from_str(&raw).ok()?;
        location.is_well_formed().then_some(location)
    }

    /// Extract a candidate slug from the parent page URL.
    fn slug_from_url(&self, page_url: &str) -> Option<String> {
        let path = match Url::parse(page_url) {
            Ok(url) => url.path().to_owned(),
            // Hosts sometimes hand us a bare path instead of a full URL.
            Err(_) if page_url.starts_with('/') => page_url.to_owned(),
            Err(_) => return None,
        };

        self.path_patterns.iter().find_map(|pattern| {
            pattern
                .captures(&path)
                .and_then(|captures| captures.get(1))
                .map(|capture| capture.as_str().to_owned())
        })
    }

    async fn lookup_slug(&self, slug: &str) -> Option<DetectedLocation> {
        match self.directory.find_by_slug(&self.agent, slug).await {
            Ok(location) => location,
            Err(err) => {
                warn!("location lookup for slug {slug} failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::directory::StaticLocationDirectory;
    use crate::storage::MemoryKeyValueStore;

    fn forge_lake() -> DetectedLocation {
        DetectedLocation {
            id: "loc-1".to_owned(),
            name: "Forge Lake".to_owned(),
            slug: Some("forge-lake".to_owned()),
            city: Some("Austin".to_owned()),
            state: Some("TX".to_owned()),
        }
    }

    fn resolver_with(
        storage: Arc<MemoryKeyValueStore>,
        locations: Vec<DetectedLocation>,
    ) -> LocationResolver {
        let config = WidgetConfig::new(AgentKey::new("agent-1"));
        let directory = Arc::new(StaticLocationDirectory::new(locations));
        match LocationResolver::new(&config, storage, directory) {
            Ok(resolver) => resolver,
            Err(err) => panic!("resolver must build: {err}"),
        }
    }

    #[tokio::test]
    async fn test_stored_selection_wins_over_everything() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let resolver = resolver_with(Arc::clone(&storage), vec![forge_lake()]);
        resolver.select_location(&forge_lake());

        let resolved = resolver
            .resolve(
                Some("https://homes.example.com/community/other-place/"),
                Some("other-place"),
            )
            .await;

        let Some(resolved) = resolved else {
            panic!("stored selection must resolve");
        };
        assert_eq!(resolved.method, DetectionMethod::UserSelected);
        assert_eq!(resolved.location, forge_lake());
    }

    #[tokio::test]
    async fn test_explicit_override_lookup() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let resolver = resolver_with(storage, vec![forge_lake()]);

        let resolved = resolver.resolve(None, Some("forge-lake")).await;
        let Some(resolved) = resolved else {
            panic!("override must resolve");
        };
        assert_eq!(resolved.method, DetectionMethod::Explicit);
    }

    #[tokio::test]
    async fn test_url_pattern_match() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let resolver = resolver_with(storage, vec![forge_lake()]);

        for url in [
            "https://homes.example.com/community/forge-lake/",
            "https://homes.example.com/locations/forge-lake",
            "https://homes.example.com/forge-lake/homes/",
        ] {
            let resolved = resolver.resolve(Some(url), None).await;
            let Some(resolved) = resolved else {
                panic!("url pattern must resolve for {url}");
            };
            assert_eq!(resolved.method, DetectionMethod::UrlPattern);
            assert_eq!(resolved.location.slug.as_deref(), Some("forge-lake"));
        }
    }

    #[tokio::test]
    async fn test_no_detection_yields_none() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let resolver = resolver_with(storage, vec![forge_lake()]);

        let resolved = resolver
            .resolve(Some("https://homes.example.com/about-us/"), None)
            .await;
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_malformed_stored_selection_is_discarded() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        storage.put("veranda_location_agent-1", "{not json");
        let resolver = resolver_with(Arc::clone(&storage), vec![forge_lake()]);

        assert!(resolver.stored_selection().is_none());
        // The chain falls through to the URL pattern instead of crashing.
        let resolved = resolver
            .resolve(Some("https://homes.example.com/community/forge-lake/"), None)
            .await;
        assert_eq!(
            resolved.map(|resolved| resolved.method),
            Some(DetectionMethod::UrlPattern)
        );
    }

    #[test]
    fn test_slug_extraction_from_bare_path() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let resolver = resolver_with(storage, vec![]);
        assert_eq!(
            resolver.slug_from_url("/community/forge-lake/"),
            Some("forge-lake".to_owned())
        );
        assert_eq!(resolver.slug_from_url("not a url"), None);
    }
}
