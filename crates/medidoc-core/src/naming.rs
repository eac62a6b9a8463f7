//! Storage-name generation.
//!
//! Every blob key is produced here and nowhere else:
//!
//! ```text
//! <unix millis>-<9-digit random>-<sanitized original name>
//! ```
//!
//! The timestamp and random disambiguator together keep concurrent uploads
//! of the same file name from colliding; the sanitized suffix keeps keys
//! readable when browsing the upload directory.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Name used when sanitization leaves nothing behind.
pub const FALLBACK_NAME: &str = "document.pdf";

const MAX_NAME_LEN: usize = 100;
const DISAMBIGUATOR_BOUND: u32 = 1_000_000_000;

/// Reduces a client-supplied file name to a safe single path component.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
/// become `_`, leading dots are stripped and the result is capped at
/// 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim_start_matches('.');
    let capped: String = trimmed.chars().take(MAX_NAME_LEN).collect();

    if capped.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        capped
    }
}

/// Builds a storage key from explicit parts.
pub fn storage_name(suggested: &str, now: DateTime<Utc>, disambiguator: u32) -> String {
    format!(
        "{}-{:09}-{}",
        now.timestamp_millis(),
        disambiguator % DISAMBIGUATOR_BOUND,
        sanitize_filename(suggested)
    )
}

/// Builds a fresh storage key from the current time and a random value.
pub fn generate_storage_name(suggested: &str) -> String {
    let disambiguator = rand::thread_rng().gen_range(0..DISAMBIGUATOR_BOUND);
    storage_name(suggested, Utc::now(), disambiguator)
}

/// Whether `key` can name a blob directly under the storage root.
///
/// Keys come back from the metadata table, so anything that could escape
/// the root (separators, `..`) is refused rather than trusted.
pub fn is_valid_storage_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}
