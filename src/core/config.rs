//! Configuration for the widget runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{WidgetError, WidgetResult};
use crate::core::ids::AgentKey;

/// Top-level configuration for one embedded widget instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Tenant/agent this widget belongs to.
    pub agent: AgentKey,
    /// Base URL of the embedding site's API for assisted location lookup.
    pub site_api_base: Option<String>,
    /// Externally supplied location slug (data attribute on the embed tag).
    pub location_override: Option<String>,
    /// URL of the parent page hosting the widget.
    pub page_url: Option<String>,
    /// Raw document referrer of the parent page, if any.
    pub referrer: Option<String>,
    /// Debounce before unread assistant messages are marked read.
    #[serde(with = "duration_serde")]
    pub read_receipt_debounce: Duration,
    /// Hard deadline for the assisted site-API lookup.
    #[serde(with = "duration_serde")]
    pub site_api_timeout: Duration,
    /// Maximum characters kept in a conversation preview.
    pub preview_max_chars: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            agent: AgentKey::new("default"),
            site_api_base: None,
            location_override: None,
            page_url: None,
            referrer: None,
            read_receipt_debounce: Duration::from_millis(500),
            site_api_timeout: Duration::from_secs(5),
            preview_max_chars: 80,
        }
    }
}

impl WidgetConfig {
    /// Create a configuration for the given agent with default settings.
    #[must_use]
    pub fn new(agent: AgentKey) -> Self {
        Self {
            agent,
            ..Self::default()
        }
    }

    /// Set the embedding site's API base for assisted location lookup.
    #[must_use]
    pub fn with_site_api_base(mut self, base: impl Into<String>) -> Self {
        self.site_api_base = Some(base.into());
        self
    }

    /// Set an explicit location override slug.
    #[must_use]
    pub fn with_location_override(mut self, slug: impl Into<String>) -> Self {
        self.location_override = Some(slug.into());
        self
    }

    /// Set the parent page URL.
    #[must_use]
    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Set the parent page referrer.
    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Set the read-receipt debounce.
    #[must_use]
    pub const fn with_read_receipt_debounce(mut self, debounce: Duration) -> Self {
        self.read_receipt_debounce = debounce;
        self
    }

    /// Set the assisted lookup deadline.
    #[must_use]
    pub const fn with_site_api_timeout(mut self, timeout: Duration) -> Self {
        self.site_api_timeout = timeout;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> WidgetResult<()> {
        if self.agent.is_empty() {
            return Err(WidgetError::InvalidConfig(
                "agent must not be empty".to_owned(),
            ));
        }

        if self.preview_max_chars == 0 {
            return Err(WidgetError::InvalidConfig(
                "preview_max_chars must be > 0".to_owned(),
            ));
        }

        if self.site_api_timeout.is_zero() {
            return Err(WidgetError::InvalidConfig(
                "site_api_timeout must be > 0".to_owned(),
            ));
        }

        if let Some(base) = &self.site_api_base {
            Url::parse(base)?;
        }

        Ok(())
    }
}

/// Serde module for Duration serialization in milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WidgetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_receipt_debounce, Duration::from_millis(500));
        assert_eq!(config.site_api_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = WidgetConfig::new(AgentKey::new("agent-1"))
            .with_site_api_base("https://homes.example.com")
            .with_location_override("forge-lake")
            .with_page_url("https://homes.example.com/community/forge-lake/")
            .with_site_api_timeout(Duration::from_secs(3));

        assert!(config.validate().is_ok());
        assert_eq!(config.location_override.as_deref(), Some("forge-lake"));
        assert_eq!(config.site_api_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_empty_agent_rejected() {
        let config = WidgetConfig::new(AgentKey::new(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_site_api_base_rejected() {
        let config = WidgetConfig::default().with_site_api_base("not a url");
        assert!(config.validate().is_err());
    }
}
