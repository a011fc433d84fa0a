// src/checker/soft404.rs
// =============================================================================
// Soft-404 detection: pages that answer "200 OK" but are really error pages.
//
// This is a heuristic. We only look at HTML responses, only at the start of
// the body, and only for a fixed list of phrases that error pages commonly
// contain.
// =============================================================================

/// How much of the body is inspected.
pub const SNIPPET_LIMIT: usize = 8 * 1024;

// Lowercase phrases that mark a page as a probable soft-404
const MARKERS: &[&str] = &[
    "page not found",
    "404 not found",
    "404 error",
    "not found</title>",
    "<title>404",
    "does not exist",
    "no longer available",
    "page doesn't exist",
    "page does not exist",
    "we couldn't find",
    "we can't find",
];

/// True for content types whose body is worth inspecting.
pub fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Returns true if the body snippet of an HTML response looks like an error page.
pub fn looks_like_soft_404(content_type: &str, snippet: &[u8]) -> bool {
    if !is_html(content_type) {
        return false;
    }

    let end = snippet.len().min(SNIPPET_LIMIT);
    let text = String::from_utf8_lossy(&snippet[..end]).to_lowercase();
    MARKERS.iter().any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let body = b"<html><head><TITLE>Page Not Found</TITLE></head></html>";
        assert!(looks_like_soft_404("text/html; charset=utf-8", body));
    }

    #[test]
    fn test_normal_page_is_not_flagged() {
        let body = b"<html><head><title>Welcome</title></head><body>Hello</body></html>";
        assert!(!looks_like_soft_404("text/html", body));
    }

    #[test]
    fn test_non_html_is_never_flagged() {
        assert!(!looks_like_soft_404("application/json", b"{\"error\": \"page not found\"}"));
        assert!(!looks_like_soft_404("", b"page not found"));
    }

    #[test]
    fn test_only_the_first_8kb_counts() {
        let mut body = vec![b' '; SNIPPET_LIMIT];
        body.extend_from_slice(b"page not found");
        assert!(!looks_like_soft_404("text/html", &body));
    }

    #[test]
    fn test_xhtml_counts_as_html() {
        assert!(is_html("application/xhtml+xml"));
        assert!(looks_like_soft_404("application/xhtml+xml", b"<title>404 - gone</title>"));
    }
}
