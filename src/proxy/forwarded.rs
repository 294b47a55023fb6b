//! `forwarded` chain metadata: address tokens, hop parsing, loop detection.
//!
//! # Responsibilities
//! - Format socket addresses into `host:port` tokens (IPv6 bracketed)
//! - Build the chain token appended on each forwarded hop
//! - Parse inbound `forwarded` headers permissively
//! - Detect requests that already traversed this proxy instance
//!
//! # Design Decisions
//! - Parsing never fails: malformed segments are skipped, not fatal
//! - Multiple header lines and comma-joined hops are both honored
//! - Loop detection runs before authorization and before any outbound I/O

use std::net::SocketAddr;

use hyper::header::{self, HeaderMap};

/// Format an IP address and port into the `host:port` token used in
/// `forwarded` metadata. IPv6 literals are bracketed: `::1` → `[::1]:8080`.
///
/// Pure and total: any string input yields a deterministic token.
pub fn format_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Format a socket address into its `forwarded` token.
pub fn address_token(addr: &SocketAddr) -> String {
    format_address(&addr.ip().to_string(), addr.port())
}

/// Serialize one hop's chain token: `by=..;for=..;host=..;proto=..`.
pub fn chain_token(by: &str, for_: &str, host: &str, proto: &str) -> String {
    format!("by={};for={};host={};proto={}", by, for_, host, proto)
}

/// One hop of a `forwarded` header, parsed into its `key=value` pairs.
///
/// The parser is deliberately permissive: segments without `=` are skipped,
/// surrounding whitespace is trimmed, and nothing is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedElement {
    pairs: Vec<(String, String)>,
}

impl ForwardedElement {
    /// Parse one `;`-separated hop entry.
    pub fn parse(hop: &str) -> Self {
        let pairs = hop
            .split(';')
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { pairs }
    }

    /// Look up the first value for a key, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse every hop of every `forwarded` header line on a request.
pub fn parse_forwarded(headers: &HeaderMap) -> Vec<ForwardedElement> {
    headers
        .get_all(header::FORWARDED)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(ForwardedElement::parse)
        .collect()
}

/// Check whether this request already passed through this proxy instance.
///
/// True iff any hop carries `by` equal to `self_token`. A request matching
/// here must short-circuit to the liveness response; forwarding it would
/// loop forever.
pub fn is_self_request(headers: &HeaderMap, self_token: &str) -> bool {
    parse_forwarded(headers)
        .iter()
        .any(|hop| hop.get("by") == Some(self_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers_with_forwarded(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(header::FORWARDED, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn ipv4_token_is_plain() {
        assert_eq!(format_address("127.0.0.1", 8080), "127.0.0.1:8080");
    }

    #[test]
    fn ipv6_token_is_bracketed() {
        assert_eq!(format_address("::1", 8080), "[::1]:8080");
        assert_eq!(
            format_address("2001:db8::1", 443),
            "[2001:db8::1]:443"
        );
    }

    #[test]
    fn chain_token_field_order() {
        assert_eq!(
            chain_token("10.0.0.1:8080", "10.0.0.2:51000", "example.com", "http"),
            "by=10.0.0.1:8080;for=10.0.0.2:51000;host=example.com;proto=http"
        );
    }

    #[test]
    fn absent_header_is_not_self() {
        let headers = HeaderMap::new();
        assert!(!is_self_request(&headers, "10.0.0.1:8080"));
    }

    #[test]
    fn detects_own_token_in_single_hop() {
        let headers =
            headers_with_forwarded(&["by=10.0.0.1:8080;for=10.0.0.2:51000;host=a;proto=http"]);
        assert!(is_self_request(&headers, "10.0.0.1:8080"));
        assert!(!is_self_request(&headers, "10.0.0.9:8080"));
    }

    #[test]
    fn detects_own_token_in_later_hop() {
        let headers = headers_with_forwarded(&[
            "by=10.0.0.5:3128;for=10.0.0.6:40000, by=10.0.0.1:8080;for=10.0.0.5:3128",
        ]);
        assert!(is_self_request(&headers, "10.0.0.1:8080"));
    }

    #[test]
    fn detects_own_token_across_header_lines() {
        let headers = headers_with_forwarded(&[
            "by=10.0.0.5:3128;for=10.0.0.6:40000",
            "by=10.0.0.1:8080;for=10.0.0.5:3128",
        ]);
        assert!(is_self_request(&headers, "10.0.0.1:8080"));
    }

    #[test]
    fn tolerates_irregular_spacing() {
        let headers = headers_with_forwarded(&["by = 10.0.0.1:8080 ; for= 10.0.0.2:51000"]);
        assert!(is_self_request(&headers, "10.0.0.1:8080"));
    }

    #[test]
    fn skips_segments_without_equals() {
        let headers = headers_with_forwarded(&["malformed;by=10.0.0.1:8080;alsobad"]);
        assert!(is_self_request(&headers, "10.0.0.1:8080"));

        let headers = headers_with_forwarded(&["justgarbage"]);
        assert!(!is_self_request(&headers, "10.0.0.1:8080"));
    }

    #[test]
    fn ipv6_self_token_round_trips() {
        let addr: SocketAddr = "[::1]:8080".parse().unwrap();
        let token = address_token(&addr);
        assert_eq!(token, "[::1]:8080");
        let headers = headers_with_forwarded(&["by=[::1]:8080;for=[::1]:51000"]);
        assert!(is_self_request(&headers, &token));
    }

    #[test]
    fn element_lookup_is_key_case_insensitive() {
        let element = ForwardedElement::parse("By=10.0.0.1:8080;Proto=https");
        assert_eq!(element.get("by"), Some("10.0.0.1:8080"));
        assert_eq!(element.get("proto"), Some("https"));
        assert_eq!(element.get("for"), None);
    }
}
