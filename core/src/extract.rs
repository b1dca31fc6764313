//! Message extraction from HTML error pages.

use std::sync::LazyLock;

use regex::Regex;

/// `<p.*?>(.*?)</p>` where `.` stops at every line terminator, U+0085 and
/// U+2028/U+2029 included, not only `\n`.
static PARAGRAPH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"(?i)<p[^\r\n\x{85}\x{2028}\x{2029}]*?>([^\r\n\x{85}\x{2028}\x{2029}]*?)</p>",
    )
});

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Covered by the `load_regex` test.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

/// Decode an error body one byte per char (Latin-1) and drop CR/LF.
///
/// Error pages are not assumed to be UTF-8; multi-byte sequences come out
/// as one char per byte.
pub fn decode_error_body(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| char::from(b))
        .filter(|&c| c != '\r' && c != '\n')
        .collect()
}

/// Text inside the last `<p ...>...</p>` fragment, or empty if none match.
pub fn extract_message(body: &str) -> String {
    PARAGRAPH_REGEX
        .captures_iter(body)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
