//! Pure text transforms applied at render time.

pub mod attribution;
pub mod sanitizer;

pub use attribution::{detect_entry_type, parse_utm_params, EntryType, UtmParams};
pub use sanitizer::ContentSanitizer;
