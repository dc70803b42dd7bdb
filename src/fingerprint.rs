// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client fingerprinting for rate limiting.
//!
//! A fingerprint is the client's apparent address joined with a truncated
//! base64 encoding of its user agent, so clients behind a shared proxy are
//! counted separately without any prior registration.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::net::IpAddr;

/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Number of base64 characters of the user agent kept in a fingerprint.
pub const USER_AGENT_DIGEST_LEN: usize = 16;

/// Rate limiting key derived from an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    /// Build a fingerprint from an address and an optional user agent.
    pub fn from_parts(ip: &str, user_agent: Option<&str>) -> Self {
        Self(format!("{}:{}", ip, user_agent_digest(user_agent.unwrap_or(""))))
    }

    /// Derive the fingerprint of a request from its headers and peer address.
    pub fn from_request(headers: &HeaderMap, peer: Option<IpAddr>) -> Self {
        let ip = get_client_ip(headers, peer);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok());
        Self::from_parts(&ip, user_agent)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the client address of a request.
///
/// Uses the first entry of `X-Forwarded-For`, then the direct peer address,
/// and finally the empty string.
pub fn get_client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(peer)) => peer.to_string(),
        (None, None) => String::new(),
    }
}

fn user_agent_digest(user_agent: &str) -> String {
    let mut encoded = STANDARD.encode(user_agent.as_bytes());
    // base64 output is ASCII so byte truncation stays on a char boundary
    encoded.truncate(USER_AGENT_DIGEST_LEN);
    encoded
}
