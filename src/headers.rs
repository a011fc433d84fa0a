// src/headers.rs
// =============================================================================
// This module builds browser-realistic HTTP request headers.
//
// Many servers reject requests that obviously don't come from a browser
// (no Accept-Language, a library User-Agent, missing Sec-Fetch-* headers).
// Every request we send, sitemap fetches and URL probes alike, carries a
// header set that matches the identity (User-Agent) it claims to be.
//
// Key functionality:
// - A table of named identity presets (Chrome, Firefox, Safari, Edge)
// - Detecting the browser family from a User-Agent string
// - Building the header list for that family
//
// Rust concepts:
// - &'static str: String data baked into the binary
// - Enums: To represent the browser family
// - Pure functions: Same input always gives the same output
// =============================================================================

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Label used when a User-Agent string doesn't match any preset.
pub const CUSTOM_LABEL: &str = "Custom";

/// Name of the preset used when no User-Agent is given.
pub const DEFAULT_PRESET: &str = "Chrome macOS (default)";

/// Name of the preset used for the alternate-identity retry.
pub const SAFARI_PRESET: &str = "Safari macOS";

// (label, user agent) pairs, in the order they're shown to the user
const PRESETS: &[(&str, &str)] = &[
    (
        DEFAULT_PRESET,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "Chrome Windows",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "Firefox Windows",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    ),
    (
        SAFARI_PRESET,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    ),
    (
        "Safari iPhone",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    ),
    (
        "Edge Windows",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    ),
];

/// The identity a probe presents to the server: a short label for reports
/// plus the actual User-Agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub label: String,
    pub user_agent: String,
}

impl Identity {
    /// All built-in presets, in display order.
    pub fn presets() -> Vec<Identity> {
        PRESETS
            .iter()
            .map(|(label, ua)| Identity {
                label: label.to_string(),
                user_agent: ua.to_string(),
            })
            .collect()
    }

    /// Looks up a preset by its label (case-insensitive).
    pub fn preset(label: &str) -> Option<Identity> {
        PRESETS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(name, ua)| Identity {
                label: name.to_string(),
                user_agent: ua.to_string(),
            })
    }

    // Wraps a User-Agent string, naming it after the preset it matches.
    // An empty string means "use the default preset".
    pub fn from_user_agent(user_agent: &str) -> Identity {
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return Identity::default();
        }

        let label = PRESETS
            .iter()
            .find(|(_, ua)| *ua == user_agent)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| CUSTOM_LABEL.to_string());

        Identity {
            label,
            user_agent: user_agent.to_string(),
        }
    }

    /// Resolves command-line input that is either a preset name or a raw UA.
    pub fn from_input(input: &str) -> Identity {
        Identity::preset(input.trim()).unwrap_or_else(|| Identity::from_user_agent(input))
    }

    // The identity we fall back to when the primary one gets a 403/404.
    // Safari is the usual pick; if we're already Safari, switch to Chrome.
    pub fn alternate_for(primary: &Identity) -> Identity {
        let safari = Identity::preset(SAFARI_PRESET).unwrap_or_default();
        if primary.user_agent == safari.user_agent {
            Identity::default()
        } else {
            safari
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        let (label, ua) = PRESETS[0];
        Identity {
            label: label.to_string(),
            user_agent: ua.to_string(),
        }
    }
}

// Browser families send noticeably different header sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Chromium,
    Firefox,
    Safari,
}

fn detect_family(user_agent: &str) -> Family {
    // Order matters: Chrome and Edge UAs also contain "Safari"
    if user_agent.contains("Firefox/") {
        Family::Firefox
    } else if user_agent.contains("Chrome/")
        || user_agent.contains("Chromium/")
        || user_agent.contains("Edg/")
    {
        Family::Chromium
    } else if user_agent.contains("Safari/") && user_agent.contains("Version/") {
        Family::Safari
    } else {
        Family::Chromium
    }
}

fn platform_hint(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "\"Windows\""
    } else if user_agent.contains("Android") {
        "\"Android\""
    } else if user_agent.contains("Macintosh") {
        "\"macOS\""
    } else if user_agent.contains("Linux") {
        "\"Linux\""
    } else {
        "\"Unknown\""
    }
}

// Builds the request headers for a User-Agent string
//
// Parameters:
//   user_agent: the UA string the request will claim
//
// Returns: ordered (header name, value) pairs. User-Agent is always present
// and always exactly the string given.
pub fn build_headers(user_agent: &str) -> Vec<(&'static str, String)> {
    let family = detect_family(user_agent);
    let mut headers = vec![("user-agent", user_agent.to_string())];

    match family {
        Family::Chromium => {
            headers.push((
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".to_string(),
            ));
            headers.push(("accept-language", "en-US,en;q=0.9".to_string()));
            headers.push(("accept-encoding", "gzip, deflate, br".to_string()));
            let brand = if user_agent.contains("Edg/") {
                "\"Microsoft Edge\";v=\"124\", \"Chromium\";v=\"124\", \"Not-A.Brand\";v=\"99\""
            } else {
                "\"Google Chrome\";v=\"124\", \"Chromium\";v=\"124\", \"Not-A.Brand\";v=\"99\""
            };
            headers.push(("sec-ch-ua", brand.to_string()));
            let mobile = if user_agent.contains("Mobile") { "?1" } else { "?0" };
            headers.push(("sec-ch-ua-mobile", mobile.to_string()));
            headers.push(("sec-ch-ua-platform", platform_hint(user_agent).to_string()));
        }
        Family::Firefox => {
            headers.push((
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
            ));
            headers.push(("accept-language", "en-US,en;q=0.5".to_string()));
            headers.push(("accept-encoding", "gzip, deflate, br".to_string()));
        }
        Family::Safari => {
            headers.push((
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ));
            headers.push(("accept-language", "en-US,en;q=0.9".to_string()));
            headers.push(("accept-encoding", "gzip, deflate, br".to_string()));
        }
    }

    headers.push(("sec-fetch-dest", "document".to_string()));
    headers.push(("sec-fetch-mode", "navigate".to_string()));
    headers.push(("sec-fetch-site", "none".to_string()));
    headers.push(("sec-fetch-user", "?1".to_string()));
    headers.push(("upgrade-insecure-requests", "1".to_string()));

    headers
}

/// Converts a header list into a `HeaderMap`, dropping values that aren't
/// valid header bytes.
pub fn to_header_map(headers: &[(&'static str, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                map.insert(HeaderName::from_static(name), value);
            }
            Err(_) => warn!("Dropping invalid value for header {}", name),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_user_agent_is_passed_through() {
        let headers = build_headers("my-agent/1.0");
        assert_eq!(lookup(&headers, "user-agent"), Some("my-agent/1.0"));
        assert!(lookup(&headers, "accept").is_some());
        assert!(lookup(&headers, "accept-language").is_some());
        assert!(lookup(&headers, "accept-encoding").is_some());
    }

    #[test]
    fn test_chrome_gets_client_hints() {
        let chrome = Identity::default();
        let headers = build_headers(&chrome.user_agent);
        assert_eq!(lookup(&headers, "sec-ch-ua-platform"), Some("\"macOS\""));
        assert_eq!(lookup(&headers, "sec-ch-ua-mobile"), Some("?0"));
    }

    #[test]
    fn test_firefox_and_safari_skip_client_hints() {
        for label in ["Firefox Windows", SAFARI_PRESET] {
            let identity = Identity::preset(label).unwrap();
            let headers = build_headers(&identity.user_agent);
            assert!(lookup(&headers, "sec-ch-ua").is_none(), "{}", label);
            assert_eq!(lookup(&headers, "sec-fetch-mode"), Some("navigate"));
        }
    }

    #[test]
    fn test_family_detection() {
        let edge = Identity::preset("Edge Windows").unwrap();
        assert_eq!(detect_family(&edge.user_agent), Family::Chromium);
        let safari = Identity::preset("Safari iPhone").unwrap();
        assert_eq!(detect_family(&safari.user_agent), Family::Safari);
        assert_eq!(detect_family("curl/8.0"), Family::Chromium);
    }

    #[test]
    fn test_build_headers_is_deterministic() {
        let ua = Identity::default().user_agent;
        assert_eq!(build_headers(&ua), build_headers(&ua));
    }

    #[test]
    fn test_identity_labels() {
        assert_eq!(Identity::from_user_agent("").label, DEFAULT_PRESET);
        assert_eq!(Identity::from_user_agent("bot/1").label, CUSTOM_LABEL);
        assert_eq!(Identity::from_input("safari macos").label, SAFARI_PRESET);

        let safari = Identity::preset(SAFARI_PRESET).unwrap();
        assert_eq!(Identity::from_user_agent(&safari.user_agent).label, SAFARI_PRESET);
    }

    #[test]
    fn test_alternate_is_distinct_from_primary() {
        let chrome = Identity::default();
        assert_eq!(Identity::alternate_for(&chrome).label, SAFARI_PRESET);

        let safari = Identity::preset(SAFARI_PRESET).unwrap();
        assert_eq!(Identity::alternate_for(&safari).label, DEFAULT_PRESET);
    }

    #[test]
    fn test_header_map_drops_invalid_values() {
        let map = to_header_map(&build_headers("bad\nagent"));
        assert!(map.get("user-agent").is_none());
        assert!(map.get("accept").is_some());
    }
}
