//! Block identifier markers.
//!
//! Every block that owns sidecar formatting is preceded in the plain text by
//! a comment line carrying its identifier:
//!
//! ```text
//! <!-- @mid:k3x9a0b2 -->
//! ## Plan
//! ```

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<!-- @mid:([A-Za-z0-9_-]+) -->\s*$").expect("valid marker regex")
});

/// Length of generated block ids.
const GENERATED_ID_LEN: usize = 8;

/// Format the marker line for a block id.
///
/// # Examples
///
/// ```
/// use sidemark_core::block_id::format_marker;
///
/// assert_eq!(format_marker("abc123"), "<!-- @mid:abc123 -->");
/// ```
pub fn format_marker(id: &str) -> String {
    format!("<!-- @mid:{} -->", id)
}

/// Extract the block id from a marker line.
///
/// # Examples
///
/// ```
/// use sidemark_core::block_id::parse_marker;
///
/// assert_eq!(parse_marker("<!-- @mid:def456 -->"), Some("def456"));
/// assert_eq!(parse_marker("  <!-- @mid:a_b-c -->  "), Some("a_b-c"));
/// assert_eq!(parse_marker("<!-- @mid:bad id -->"), None);
/// assert_eq!(parse_marker("text <!-- @mid:x -->"), None);
/// ```
pub fn parse_marker(line: &str) -> Option<&str> {
    MARKER_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether a token is usable as a block id.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generate a fresh short block id.
pub fn generate_block_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_ID_LEN);
    id
}

/// Every block id that appears in a marker line of `text`, in document order.
pub fn collect_block_ids(text: &str) -> IndexSet<String> {
    text.lines()
        .filter_map(|line| {
            // Markers also appear inside quotes ("> <!-- ... -->") and list items.
            let line = line.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
            parse_marker(line)
        })
        .map(String::from)
        .collect()
}
