//! URL fragment mirroring of the current query.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;

/// Characters `encodeURIComponent` leaves alone.
const FRAGMENT_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// What the host should do with the location fragment after an input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "fragment", rename_all = "snake_case")]
pub enum FragmentUpdate {
    /// Navigate to `#<encoded query>`.
    Set(String),
    /// Clear the fragment with a history replace, not a navigation.
    Replace,
}

pub fn encode_fragment(query: &str) -> String {
    utf8_percent_encode(query, FRAGMENT_ESCAPES).to_string()
}

/// Strips an optional leading `#` and percent-decodes. Invalid UTF-8 is
/// replaced rather than rejected.
pub fn decode_fragment(fragment: &str) -> String {
    let raw = fragment.strip_prefix('#').unwrap_or(fragment);
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
