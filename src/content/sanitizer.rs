//! Message text sanitation.
//!
//! When a richer UI affordance supersedes raw text (a link-preview card, a
//! tap-to-call button), the equivalent substring is stripped from the
//! message body so the same content is not rendered twice. All transforms
//! are deterministic, total, and gated by the caller's affordance flags.

use regex::Regex;

use crate::core::errors::WidgetResult;

/// Compiled sanitation patterns. Build once, reuse per render.
pub struct ContentSanitizer {
    url_with_leadin: Regex,
    phone_with_leadin: Regex,
    repeated_spaces: Regex,
    trailing_line_spaces: Regex,
    excess_newlines: Regex,
    empty_parens: Regex,
}

impl ContentSanitizer {
    /// Compile the sanitation patterns.
    ///
    /// # Errors
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> WidgetResult<Self> {
        Ok(Self {
            // Lead-in phrase (colon optional) plus the URL it introduces,
            // or a bare URL on its own.
            url_with_leadin: Regex::new(
                r#"(?i)(?:\b(?:learn more|read more|more info|check out|visit|see)\s*:?\s*)?https?://[^\s<>"')\]]+"#,
            )?,
            // Phone lead-in plus a US-style number, or a bare number.
            phone_with_leadin: Regex::new(
                r"(?i)(?:\b(?:give us a call at|call us at|call us|call|dial|phone|tel)\s*:?\s*)?(?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b",
            )?,
            repeated_spaces: Regex::new(r"[ \t]{2,}")?,
            trailing_line_spaces: Regex::new(r"[ \t]+\n")?,
            excess_newlines: Regex::new(r"\n{3,}")?,
            empty_parens: Regex::new(r"\(\s*\)")?,
        })
    }

    /// Strip raw URLs (and their lead-in phrases) from message text.
    ///
    /// Identity when `has_link_previews` is false: with no preview cards
    /// rendered, the raw URL is the only affordance the visitor gets.
    #[must_use]
    pub fn strip_urls(&self, text: &str, has_link_previews: bool) -> String {
        if !has_link_previews {
            return text.to_owned();
        }
        let stripped = self.url_with_leadin.replace_all(text, "");
        self.cleanup_formatting(&stripped)
    }

    /// Strip phone numbers (and their lead-in phrases) from message text.
    ///
    /// Identity when `has_call_actions` is false.
    #[must_use]
    pub fn strip_phone_numbers(&self, text: &str, has_call_actions: bool) -> String {
        if !has_call_actions {
            return text.to_owned();
        }
        let stripped = self.phone_with_leadin.replace_all(text, "");
        self.cleanup_formatting(&stripped)
    }

    /// Collapse whitespace artifacts left behind by substring removal:
    /// repeated spaces become one, three or more newlines become two,
    /// dangling empty parentheses and leading/trailing blank runs go away.
    #[must_use]
    pub fn cleanup_formatting(&self, text: &str) -> String {
        let text = self.empty_parens.replace_all(text, "");
        let text = self.repeated_spaces.replace_all(&text, " ");
        let text = self.trailing_line_spaces.replace_all(&text, "\n");
        let text = self.excess_newlines.replace_all(&text, "\n\n");
        text.trim().to_owned()
    }
}
