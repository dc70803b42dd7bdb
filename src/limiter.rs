// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for form submissions.
//!
//! Each client fingerprint gets a quota of `max_requests` per window. The
//! window starts at the client's first request and resets wholesale once it
//! expires, so a client can burst up to twice the quota across a boundary.
//!
//! Expired windows are swept on every check, inside the same critical
//! section as the check-and-increment.

use crate::config::RateLimitConfig;
use crate::fingerprint::ClientFingerprint;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// When the current window ends
        reset_at: Instant,
    },
    /// Request is rate limited
    Limited {
        /// Whole seconds until the window ends, rounded up
        retry_after_secs: u64,
        /// When the current window ends
        reset_at: Instant,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Remaining quota; zero once limited.
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    pub fn reset_at(&self) -> Instant {
        match self {
            RateLimitResult::Allowed { reset_at, .. } | RateLimitResult::Limited { reset_at, .. } => {
                *reset_at
            }
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitResult::Allowed { .. } => None,
            RateLimitResult::Limited { retry_after_secs, .. } => Some(*retry_after_secs),
        }
    }

    /// Time left in the window as seen from `now`.
    pub fn reset_in(&self, now: Instant) -> Duration {
        self.reset_at().saturating_duration_since(now)
    }

    /// Whole seconds left in the window, rounded up like `retry_after_secs`.
    pub fn reset_in_secs(&self, now: Instant) -> u64 {
        match self {
            RateLimitResult::Limited { retry_after_secs, .. } => *retry_after_secs,
            RateLimitResult::Allowed { .. } => ceil_secs(self.reset_in(now)),
        }
    }
}

/// Per-fingerprint window state.
#[derive(Debug, Clone, Copy)]
struct ClientWindowState {
    /// Requests admitted in the current window
    count: u32,
    /// When the window expires
    reset_at: Instant,
}

/// Thread-safe fixed-window rate limiter.
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Window state per client fingerprint
    clients: Mutex<HashMap<ClientFingerprint, ClientWindowState>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check rate limit for a request, deriving its fingerprint first.
    pub async fn check_request(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> RateLimitResult {
        let fingerprint = ClientFingerprint::from_request(headers, peer);
        self.check(&fingerprint).await
    }

    /// Check and count a request from `fingerprint`.
    pub async fn check(&self, fingerprint: &ClientFingerprint) -> RateLimitResult {
        self.check_at(fingerprint, Instant::now()).await
    }

    /// Check and count a request from `fingerprint` as of `now`.
    pub async fn check_at(&self, fingerprint: &ClientFingerprint, now: Instant) -> RateLimitResult {
        let max = self.config.max_requests;
        let mut clients = self.clients.lock().await;

        sweep(&mut clients, now);

        // Sweep already dropped expired windows, so an existing entry is live.
        let state = clients.entry(fingerprint.clone()).or_insert_with(|| {
            debug!(%fingerprint, "New rate limit window");
            ClientWindowState {
                count: 0,
                reset_at: now + self.config.window_duration(),
            }
        });

        if state.count >= max {
            let retry_after_secs = ceil_secs(state.reset_at.saturating_duration_since(now));
            debug!(%fingerprint, retry_after_secs, "Rate limit exceeded");
            return RateLimitResult::Limited {
                retry_after_secs,
                reset_at: state.reset_at,
            };
        }

        state.count += 1;
        debug!(%fingerprint, count = state.count, "Request counted");
        RateLimitResult::Allowed {
            remaining: max.saturating_sub(state.count),
            reset_at: state.reset_at,
        }
    }

    /// Remove expired windows.
    pub async fn cleanup(&self) {
        let mut clients = self.clients.lock().await;
        let removed = sweep(&mut clients, Instant::now());
        if removed > 0 {
            debug!(removed, remaining = clients.len(), "Rate limiter cleanup completed");
        }
    }

    /// Number of fingerprints currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

fn sweep(clients: &mut HashMap<ClientFingerprint, ClientWindowState>, now: Instant) -> usize {
    let before = clients.len();
    clients.retain(|_, state| state.reset_at > now);
    before - clients.len()
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
