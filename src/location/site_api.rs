//! Assisted slug lookup against the embedding site's API.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::core::errors::WidgetResult;

/// Response shape of the site's home-to-community mapping endpoint.
#[derive(Debug, Deserialize)]
struct CommunityLookup {
    community_slug: Option<String>,
}

/// HTTP client for the embedding site's WordPress-style JSON API.
///
/// Used only when a URL pattern captured a slug that has no direct match in
/// the location directory: many sites nest home pages under a parent
/// community page, and the API resolves the child slug to its parent.
pub struct SiteApiClient {
    client: reqwest::Client,
    base: Url,
}

impl SiteApiClient {
    /// Build a client for the given API base with a hard deadline on every
    /// request. Timeouts and non-2xx responses are treated as "no result",
    /// never surfaced to the visitor.
    ///
    /// # Errors
    /// Returns an error if the base URL is malformed or the HTTP client
    /// cannot be constructed.
    pub fn new(base: &str, timeout: Duration) -> WidgetResult<Self> {
        let base = Url::parse(base)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    /// Resolve a home-page slug to its parent community slug.
    ///
    /// Any failure (timeout, non-2xx, malformed body) yields `None`.
    pub async fn community_slug_for_home(&self, home_slug: &str) -> Option<String> {
        let url = self
            .base
            .join(&format!("wp-json/veranda/v1/community-for/{home_slug}"))
            .ok()?;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("site api lookup failed for {home_slug}: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(
                "site api returned {} for {home_slug}, treating as no result",
                response.status()
            );
            return None;
        }

        match response.json::<CommunityLookup>().await {
            Ok(lookup) => lookup.community_slug.filter(|slug| !slug.is_empty()),
            Err(err) => {
                warn!("site api returned malformed body for {home_slug}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_malformed_base() {
        assert!(SiteApiClient::new("not a url", Duration::from_secs(5)).is_err());
        assert!(SiteApiClient::new("https://homes.example.com", Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_yields_none() {
        let Ok(client) = SiteApiClient::new("http://127.0.0.1:1", Duration::from_millis(200))
        else {
            panic!("client should build");
        };
        assert_eq!(client.community_slug_for_home("forge-lake-12").await, None);
    }
}
