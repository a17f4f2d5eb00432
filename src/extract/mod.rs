//! Download link extraction from fetched page content.
//!
//! Pages served by the target sites hand out their files through a script
//! that calls `window.open("<absolute url>")`. [`WindowOpenExtractor`] finds
//! the first such call across all `<script>` blocks in document order.
//!
//! The match is textual, not a JavaScript parse. Callers depend only on the
//! [`LinkExtractor`] trait so a structural implementation can be swapped in.

use scraper::{Html, Selector};
use tracing::trace;

/// Marker preceding the download URL literal.
const WINDOW_OPEN_MARKER: &str = "window.open(";

/// Locates a download URL in page content.
pub trait LinkExtractor: Send + Sync {
    /// Returns the first download URL found in `page`, or `None`.
    ///
    /// Must not panic on malformed input.
    fn extract(&self, page: &[u8]) -> Option<String>;
}

/// Extracts the string literal passed to `window.open(...)` inside `<script>` elements.
#[derive(Debug)]
pub struct WindowOpenExtractor {
    scripts: Selector,
}

impl WindowOpenExtractor {
    /// Creates a new extractor.
    ///
    /// # Panics
    ///
    /// Never in practice: the selector is a static, valid CSS selector.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            scripts: Selector::parse("script").expect("static selector is valid"),
        }
    }
}

impl Default for WindowOpenExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for WindowOpenExtractor {
    fn extract(&self, page: &[u8]) -> Option<String> {
        let html = String::from_utf8_lossy(page);
        let document = Html::parse_document(&html);

        document.select(&self.scripts).enumerate().find_map(|(index, script)| {
            let text: String = script.text().collect();
            let found = find_window_open_literal(&text);
            trace!(script = index, found = found.is_some(), "scanned script block");
            found.map(ToString::to_string)
        })
    }
}

/// Returns the first quoted literal following a `window.open(` marker.
///
/// Every occurrence of the marker is tried in order, so a bare
/// `window.open()` does not hide a later call with a URL. Leading whitespace
/// inside the call is skipped; both `"` and `'` quotes are accepted, and the
/// literal ends at the first matching quote. Unterminated or empty literals
/// are skipped.
pub(crate) fn find_window_open_literal(script: &str) -> Option<&str> {
    script
        .match_indices(WINDOW_OPEN_MARKER)
        .find_map(|(pos, marker)| quoted_argument(&script[pos + marker.len()..]))
}

fn quoted_argument(call: &str) -> Option<&str> {
    let rest = call.trim_start();
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let literal = &rest[quote.len_utf8()..];
    let end = literal.find(quote)?;
    let url = literal[..end].trim();

    (!url.is_empty()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(page: &str) -> Option<String> {
        WindowOpenExtractor::new().extract(page.as_bytes())
    }

    #[test]
    fn test_extracts_double_quoted_url() {
        let page = r#"<html><head><script>
            function go() { window.open("https://example.com/f.bin"); }
        </script></head><body></body></html>"#;
        assert_eq!(extract(page).as_deref(), Some("https://example.com/f.bin"));
    }

    #[test]
    fn test_extracts_single_quoted_url() {
        let page = "<script>window.open('https://example.com/a.zip', '_blank')</script>";
        assert_eq!(extract(page).as_deref(), Some("https://example.com/a.zip"));
    }

    #[test]
    fn test_first_match_in_document_order_wins() {
        let page = r#"
            <script>var x = 1;</script>
            <script>window.open("https://example.com/first.bin")</script>
            <script>window.open("https://example.com/second.bin")</script>
        "#;
        assert_eq!(
            extract(page).as_deref(),
            Some("https://example.com/first.bin")
        );
    }

    #[test]
    fn test_scripts_without_marker_yield_none() {
        let page = "<script>console.log('hi')</script><script>var a = 'window';</script>";
        assert_eq!(extract(page), None);
    }

    #[test]
    fn test_bare_call_does_not_hide_later_literal_in_same_script() {
        let page = r#"<script>var w = window.open(); w = window.open("https://example.com/f.bin");</script>"#;
        assert_eq!(extract(page).as_deref(), Some("https://example.com/f.bin"));
    }

    #[test]
    fn test_literal_finder_skips_variable_argument() {
        let script = r#"window.open(url); window.open( 'https://example.com/b.pdf' )"#;
        assert_eq!(
            find_window_open_literal(script),
            Some("https://example.com/b.pdf")
        );
    }

    #[test]
    fn test_marker_outside_script_is_ignored() {
        let page = r#"<p>window.open("https://example.com/nope.bin")</p>"#;
        assert_eq!(extract(page), None);
    }

    #[test]
    fn test_unterminated_literal_yields_none() {
        let page = r#"<script>window.open("https://example.com/f.bin</script>"#;
        assert_eq!(extract(page), None);
    }

    #[test]
    fn test_unterminated_literal_does_not_hide_later_match() {
        let page = r#"<script>window.open("broken</script>
            <script>window.open("https://example.com/ok.bin")</script>"#;
        assert_eq!(extract(page).as_deref(), Some("https://example.com/ok.bin"));
    }

    #[test]
    fn test_empty_and_garbage_input_do_not_panic() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("<script>"), None);
        assert_eq!(extract("<script>window.open(</script>"), None);
        assert_eq!(
            WindowOpenExtractor::new().extract(&[0xff, 0xfe, 0x00, 0x3c]),
            None
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let page = r#"<script>window.open("https://example.com/same.bin")</script>"#;
        let extractor = WindowOpenExtractor::new();
        let first = extractor.extract(page.as_bytes());
        let second = extractor.extract(page.as_bytes());
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_literal_handles_whitespace_and_empty() {
        assert_eq!(
            find_window_open_literal(r#"window.open(  "https://e.com/x" )"#),
            Some("https://e.com/x")
        );
        assert_eq!(find_window_open_literal(r#"window.open("")"#), None);
        assert_eq!(find_window_open_literal("window.open(url)"), None);
    }
}
