// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for flood simulation.

use axum::http::{HeaderMap, HeaderValue};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate user agents that differ within their first 12 bytes, the part
/// a fingerprint keeps.
pub fn generate_user_agents(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("agent{:03}/1.0 (compatible; scripted)", i))
        .collect()
}

/// Generate browser user agents that only differ after the shared
/// `Mozilla/5.0 ` prefix.
pub fn generate_browser_agents(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "Mozilla/5.0 (X11; Linux x86_64; rv:{v}.0) Gecko/20100101 Firefox/{v}.0",
                v = 100 + i
            )
        })
        .collect()
}

/// Headers for a request arriving through a proxy that appends the client.
pub fn proxied_headers(client: IpAddr, user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let chain = format!("{}, 172.16.0.1", client);
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert("x-forwarded-for", value);
    }
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert("user-agent", value);
    }
    headers
}

/// Generate challenge tokens; `None` models a bot that skipped the widget.
pub fn generate_tokens(count: usize, with_token_ratio: f64) -> Vec<Option<String>> {
    (0..count)
        .map(|i| {
            if (i as f64 * 0.618033988749895) % 1.0 < with_token_ratio {
                Some(format!("token-{}", i))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_user_agents_distinct_prefixes() {
        let prefixes: std::collections::HashSet<_> = generate_user_agents(10)
            .into_iter()
            .map(|ua| ua[..12].to_string())
            .collect();
        assert_eq!(prefixes.len(), 10);

        let browser_prefixes: std::collections::HashSet<_> = generate_browser_agents(10)
            .into_iter()
            .map(|ua| ua[..12].to_string())
            .collect();
        assert_eq!(browser_prefixes.len(), 1);
    }

    #[test]
    fn test_token_ratio_bounds() {
        assert!(generate_tokens(20, 0.0).iter().all(Option::is_none));
        assert!(generate_tokens(20, 1.0).iter().all(Option::is_some));
    }
}
