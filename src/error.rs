// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for gateway setup.
//!
//! The guards themselves never fail: rate limit refusals and challenge
//! failures are returned as values. These errors only arise while loading
//! configuration or wiring the service together.

use thiserror::Error;

/// Errors raised while configuring or starting the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Challenge verification requires a secret key")]
    MissingSecretKey,

    #[error("Invalid verification endpoint {url}: {source}")]
    InvalidVerifyUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
