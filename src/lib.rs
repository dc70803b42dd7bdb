// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission Guard
//!
//! This crate protects a public form endpoint (a contact or lead form) from
//! automated and excessive submissions with two guards:
//!
//! - Fixed-window rate limiting per client fingerprint (5 per 15 min default)
//! - Challenge token verification against a siteverify service
//!
//! Both guards are in-memory and process-local. Neither one fails with an
//! error: refusals are returned as values the caller branches on.

pub mod challenge;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod limiter;
pub mod metrics;

pub use challenge::{ChallengeVerifier, ErrorCode, VerificationOutcome};
pub use config::Config;
pub use error::GatewayError;
pub use fingerprint::{get_client_ip, ClientFingerprint};
pub use limiter::{RateLimitResult, RateLimiter};
