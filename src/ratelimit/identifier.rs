//! Client identifier derivation from request headers.

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Identifier used when no client address header is present.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Headers consulted for the client address, in priority order.
const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Case-insensitive read access to request headers.
pub trait HeaderLookup {
    /// Value of the named header, if present and representable as text.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderLookup for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}

impl<S: BuildHasher> HeaderLookup for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Derive the rate limit identifier for a request.
///
/// Checks `X-Forwarded-For` (first comma-separated address, trimmed), then
/// `X-Real-IP`, then `CF-Connecting-IP`, falling back to `"unknown"`. Empty
/// header values are treated as absent.
///
/// The headers are trusted as sent. This is only sound behind a reverse proxy
/// that overwrites them; otherwise clients can pick their own identifier.
pub fn derive_identifier<H: HeaderLookup + ?Sized>(headers: &H) -> String {
    let present = |name: &str| headers.header(name).filter(|value| !value.is_empty());

    if let Some(forwarded) = present(FORWARDED_FOR) {
        // X-Forwarded-For can contain multiple IPs, take the first one
        let first = forwarded.split(',').next().unwrap_or_default();
        return first.trim().to_string();
    }

    if let Some(real_ip) = present(REAL_IP) {
        return real_ip.to_string();
    }

    if let Some(connecting_ip) = present(CF_CONNECTING_IP) {
        return connecting_ip.to_string();
    }

    UNKNOWN_IDENTIFIER.to_string()
}
