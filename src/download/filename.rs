//! Filename resolution and sanitization for downloads.
//!
//! Names come from, in order: the RFC 5987 `filename*=` parameter of
//! `Content-Disposition`, its plain `filename=` parameter, and finally the
//! last `/`-separated segment of the download URL. Each level falls through
//! to the next when it is absent or malformed.

use std::path::{Component, Path};

use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use tracing::debug;

use super::constants::FALLBACK_FILENAME;

/// Resolves the local filename for a download.
///
/// Always returns a non-empty, single path component.
#[must_use]
pub fn resolve_filename(headers: &HeaderMap, download_url: &str) -> String {
    let from_header = headers
        .get(CONTENT_DISPOSITION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .and_then(|header| parse_content_disposition(&header));

    let raw = from_header
        .or_else(|| filename_from_url_tail(download_url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    let filename = sanitize_filename(&raw);
    debug!(raw = %raw, filename = %filename, "resolved filename");
    filename
}

/// Parses a Content-Disposition header value to extract the filename.
///
/// Handles:
/// - `attachment; filename*=UTF-8''report%202023.pdf` (RFC 5987, percent-decoded)
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(name) = parse_extended_filename(header) {
        return Some(name);
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();

    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"')?;
        let filename = &stripped[..end];
        return (!filename.is_empty()).then(|| filename.to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let filename = value[..end].trim();
    (!filename.is_empty()).then(|| filename.to_string())
}

fn parse_extended_filename(header: &str) -> Option<String> {
    let pos = header.find("filename*=")?;
    let value = header[pos + "filename*=".len()..].trim();
    // charset'language'encoded_value
    let quote_pos = value.find("''")?;
    let encoded = &value[quote_pos + 2..];
    let end = encoded.find(';').unwrap_or(encoded.len());
    let encoded = encoded[..end].trim().trim_matches('"');
    let decoded = urlencoding::decode(encoded).ok()?;
    (!decoded.is_empty()).then(|| decoded.into_owned())
}

/// Last `/`-separated segment of the URL string.
///
/// The query string is kept: `https://h/archive.tar.gz?x=1` yields
/// `archive.tar.gz?x=1`.
pub(crate) fn filename_from_url_tail(url: &str) -> Option<String> {
    url.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
}

/// Makes a name safe to use as a single path component.
///
/// Path separators and control characters become `_`; names that would
/// resolve to `.` or `..` have their dots replaced.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers_with_disposition(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_resolve_extended_filename_is_percent_decoded() {
        let headers = headers_with_disposition("attachment; filename*=UTF-8''report%202023.pdf");
        assert_eq!(
            resolve_filename(&headers, "https://example.com/dl?id=1"),
            "report 2023.pdf"
        );
    }

    #[test]
    fn test_resolve_quoted_filename() {
        let headers = headers_with_disposition(r#"attachment; filename="data.zip""#);
        assert_eq!(
            resolve_filename(&headers, "https://example.com/x"),
            "data.zip"
        );
    }

    #[test]
    fn test_resolve_unquoted_filename_stops_at_semicolon() {
        let headers = headers_with_disposition("attachment; filename=data.csv; size=10");
        assert_eq!(
            resolve_filename(&headers, "https://example.com/x"),
            "data.csv"
        );
    }

    #[test]
    fn test_extended_filename_wins_over_plain() {
        let headers = headers_with_disposition(
            r#"attachment; filename="fallback.txt"; filename*=UTF-8''caf%C3%A9.txt"#,
        );
        assert_eq!(resolve_filename(&headers, "https://example.com/x"), "café.txt");
    }

    #[test]
    fn test_url_tail_fallback_keeps_query_string() {
        let headers = HeaderMap::new();
        assert_eq!(
            resolve_filename(&headers, "https://example.com/files/archive.tar.gz?x=1"),
            "archive.tar.gz?x=1"
        );
    }

    #[test]
    fn test_malformed_extended_filename_falls_through_to_url() {
        // No '' delimiter after filename*=
        let headers = headers_with_disposition("attachment; filename*=UTF-8report.pdf");
        assert_eq!(
            resolve_filename(&headers, "https://example.com/a/report-final.pdf"),
            "report-final.pdf"
        );
    }

    #[test]
    fn test_unterminated_quoted_filename_falls_through_to_url() {
        let headers = headers_with_disposition(r#"attachment; filename="broken.zip"#);
        assert_eq!(
            resolve_filename(&headers, "https://example.com/b/good.zip"),
            "good.zip"
        );
    }

    #[test]
    fn test_invalid_percent_encoding_falls_through() {
        // %FF alone is not valid UTF-8
        let headers = headers_with_disposition(
            r#"attachment; filename*=UTF-8''bad%FF.bin; filename="plain.bin""#,
        );
        assert_eq!(
            resolve_filename(&headers, "https://example.com/x"),
            "plain.bin"
        );
    }

    #[test]
    fn test_empty_disposition_and_trailing_slash_url_never_empty() {
        let headers = headers_with_disposition("attachment; filename=\"\"");
        let name = resolve_filename(&headers, "https://example.com/dir/");
        assert_eq!(name, FALLBACK_FILENAME);
    }

    #[test]
    fn test_never_empty_for_assorted_inputs() {
        let dispositions = [
            "",
            "inline",
            "attachment; filename=",
            "attachment; filename*=",
            "attachment; filename*=''",
            "filename=\"",
            ";;;;",
        ];
        let urls = ["https://example.com/", "x", "/", "https://example.com/f.bin"];
        for disposition in dispositions {
            for url in urls {
                let headers = headers_with_disposition(disposition);
                let name = resolve_filename(&headers, url);
                assert!(!name.is_empty(), "empty name for {disposition:?} / {url:?}");
            }
        }
    }

    #[test]
    fn test_traversal_names_are_neutralized() {
        let headers = headers_with_disposition(r#"attachment; filename="../../etc/passwd""#);
        let name = resolve_filename(&headers, "https://example.com/x");
        assert!(!name.contains('/'));
        assert_eq!(Path::new(&name).components().count(), 1);

        assert_eq!(sanitize_filename(".."), "__");
        assert_eq!(sanitize_filename("."), "_");
    }

    #[test]
    fn test_sanitize_replaces_separators_and_controls() {
        assert_eq!(sanitize_filename("a\\b/c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("a\u{0}b"), "a_b");
        assert_eq!(sanitize_filename("   "), FALLBACK_FILENAME);
    }

    #[test]
    fn test_non_ascii_header_bytes_are_tolerated() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_bytes(b"attachment; filename=\"r\xe9sum\xe9.pdf\"").unwrap(),
        );
        let name = resolve_filename(&headers, "https://example.com/x");
        assert!(name.ends_with(".pdf"));
    }
}
