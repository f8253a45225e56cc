//! Traffic-source attribution from referrer URLs and UTM parameters.

use serde::{Deserialize, Serialize};
use url::Url;

/// How the visitor arrived at the embedding page.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// No referrer: typed URL, bookmark, or stripped referrer.
    Direct,
    /// Unpaid search engine traffic.
    Organic,
    /// Social network traffic.
    Social,
    /// Webmail client traffic.
    Email,
    /// Paid media, classified from `utm_medium`.
    Paid,
    /// Any other referring site.
    Referral,
}

impl EntryType {
    /// Stable string form for storage and analytics payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Organic => "organic",
            Self::Social => "social",
            Self::Email => "email",
            Self::Paid => "paid",
            Self::Referral => "referral",
        }
    }
}

/// Search engine referrer fragments.
const SEARCH_DOMAINS: &[&str] = &[
    "google.",
    "bing.",
    "yahoo.",
    "duckduckgo.",
    "baidu.",
    "yandex.",
    "ecosia.",
];

/// Social network referrer fragments.
const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.",
    "fb.com",
    "instagram.",
    "twitter.",
    "t.co",
    "x.com",
    "linkedin.",
    "pinterest.",
    "tiktok.",
    "youtube.",
    "reddit.",
    "threads.",
];

/// Webmail referrer fragments. Checked before search: `mail.google.com`
/// must classify as email, not organic.
const EMAIL_DOMAINS: &[&str] = &[
    "mail.google.",
    "mail.yahoo.",
    "outlook.",
    "webmail.",
    "mail.aol.",
    "proton.me",
];

/// `utm_medium` values that mark paid media.
const PAID_MEDIUMS: &[&str] = &["cpc", "ppc", "paid", "cpm", "display", "retargeting"];

/// Classify a raw referrer URL by substring match against known domain
/// lists. Null/empty referrer is `Direct`; no match is `Referral`.
#[must_use]
pub fn detect_entry_type(referrer: Option<&str>) -> EntryType {
    let Some(referrer) = referrer else {
        return EntryType::Direct;
    };
    let referrer = referrer.trim().to_lowercase();
    if referrer.is_empty() {
        return EntryType::Direct;
    }

    if EMAIL_DOMAINS.iter().any(|domain| referrer.contains(domain)) {
        return EntryType::Email;
    }
    if SOCIAL_DOMAINS.iter().any(|domain| referrer.contains(domain)) {
        return EntryType::Social;
    }
    if SEARCH_DOMAINS.iter().any(|domain| referrer.contains(domain)) {
        return EntryType::Organic;
    }

    EntryType::Referral
}

/// UTM attribution extracted from a landing URL.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UtmParams {
    /// `utm_source` query parameter.
    pub utm_source: Option<String>,
    /// `utm_medium` query parameter.
    pub utm_medium: Option<String>,
    /// `utm_campaign` query parameter.
    pub utm_campaign: Option<String>,
    /// `utm_term` query parameter.
    pub utm_term: Option<String>,
    /// `utm_content` query parameter.
    pub utm_content: Option<String>,
    /// `Paid` when `utm_medium` names a known paid-media value.
    pub entry_type: Option<EntryType>,
}

impl UtmParams {
    /// Whether no attribution was extracted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
            && self.utm_term.is_none()
            && self.utm_content.is_none()
    }
}

/// Extract UTM parameters from a landing URL. A malformed URL yields an
/// empty record, never an error.
#[must_use]
pub fn parse_utm_params(url: &str) -> UtmParams {
    let Ok(parsed) = Url::parse(url) else {
        return UtmParams::default();
    };

    let mut params = UtmParams::default();
    for (key, value) in parsed.query_pairs() {
        let value = value.into_owned();
        match key.as_ref() {
            "utm_source" => params.utm_source = Some(value),
            "utm_medium" => params.utm_medium = Some(value),
            "utm_campaign" => params.utm_campaign = Some(value),
            "utm_term" => params.utm_term = Some(value),
            "utm_content" => params.utm_content = Some(value),
            _ => {}
        }
    }

    if let Some(medium) = &params.utm_medium {
        let medium = medium.to_lowercase();
        if PAID_MEDIUMS.contains(&medium.as_str()) {
            params.entry_type = Some(EntryType::Paid);
        }
    }

    params
}
