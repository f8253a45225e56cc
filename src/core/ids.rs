//! Identifier types for the widget runtime.
//!
//! This module is intentionally **type-heavy** and **logic-light**. It
//! provides the identifier vocabulary every other module joins on:
//!
//! - [`ConversationId`] distinguishes client-generated placeholder ids from
//!   backend-issued canonical ids by format alone.
//! - [`AgentKey`] scopes storage keys and directory queries per tenant, so
//!   one browser profile can hold distinct state per embedding site.
//! - [`opaque_id`] generates the best-effort-unique random strings used for
//!   visitor/session identifiers. Uniqueness is not cryptographic; collision
//!   is an accepted, unlikely risk.

use core::fmt;
use core::str::FromStr;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix carried by every client-generated conversation placeholder id.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Generate an opaque identifier: millisecond timestamp plus random suffix.
#[must_use]
pub fn opaque_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..36_u32.pow(6));
    format!("{prefix}{millis}-{suffix:06x}")
}

/// Identifier of a conversation.
///
/// Two disjoint subtypes are distinguished by format: a client-generated
/// *local* id used before a durable conversation record exists, and a
/// *canonical* UUID issued by the backend once one does. Operations that
/// correlate with the backend (history fetch, realtime subscriptions,
/// mark-as-read) are valid only for canonical ids.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversationId {
    /// Client-generated placeholder, never sent to the backend.
    Local(String),
    /// Backend-issued durable identifier.
    Canonical(Uuid),
}

impl ConversationId {
    /// Generate a fresh local placeholder id.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(opaque_id(LOCAL_ID_PREFIX))
    }

    /// Parse an id string: UUID format is canonical, anything else local.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(uuid) => Self::Canonical(uuid),
            Err(_) => Self::Local(raw.to_owned()),
        }
    }

    /// Whether this id correlates with a durable backend conversation.
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }

    /// The backend UUID, if this id is canonical.
    #[must_use]
    pub const fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Canonical(uuid) => Some(uuid),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(raw) => f.write_str(raw),
            Self::Canonical(uuid) => write!(f, "{uuid}"),
        }
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ConversationId> for String {
    fn from(value: ConversationId) -> Self {
        value.to_string()
    }
}

impl FromStr for ConversationId {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Tenant/agent identifier used to namespace storage and directory queries.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct AgentKey(String);

impl AgentKey {
    /// Wrap a raw agent identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty (invalid for namespacing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AgentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_round_trip() {
        let uuid = Uuid::new_v4();
        let id = ConversationId::parse(&uuid.to_string());
        assert!(id.is_canonical());
        assert_eq!(id.as_uuid(), Some(&uuid));
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_local_id_is_not_canonical() {
        let id = ConversationId::new_local();
        assert!(!id.is_canonical());
        assert!(id.to_string().starts_with(LOCAL_ID_PREFIX));
        assert!(id.as_uuid().is_none());
    }

    #[test]
    fn test_parse_arbitrary_string_is_local() {
        let id = ConversationId::parse("not-a-uuid");
        assert_eq!(id, ConversationId::Local("not-a-uuid".to_owned()));
    }

    #[test]
    fn test_opaque_ids_differ() {
        let a = opaque_id("v-");
        let b = opaque_id("v-");
        assert!(a.starts_with("v-"));
        // Same-millisecond generation still differs in the random suffix.
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_transparent_string() {
        let uuid = Uuid::new_v4();
        let id: ConversationId =
            serde_json::from_str(&format!("\"{uuid}\"")).unwrap_or(ConversationId::new_local());
        assert!(id.is_canonical());
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
