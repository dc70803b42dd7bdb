// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the submission guard.
//!
//! Defaults match the contact form policy: 5 submissions per client per
//! 15 minute window, with the challenge check enabled only when both the
//! site key and the secret key are provided.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Cloudflare Turnstile siteverify endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Configuration for the submission guard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Challenge verification configuration
    #[serde(default)]
    pub challenge: ChallengeConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds (default: 900000, 15 minutes)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Requests allowed per client per window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Accepted for compatibility; the counter does not consult it.
    #[serde(default)]
    pub skip_successful_requests: bool,
}

/// Challenge (proof-of-humanity) verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Public site key handed to the form front end
    #[serde(default)]
    pub site_key: Option<String>,

    /// Private secret key sent to the verification service
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Verification endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Outbound request timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_window_ms() -> u64 {
    15 * 60 * 1000
}

fn default_max_requests() -> u32 {
    5
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            challenge: ChallengeConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            skip_successful_requests: false,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            site_key: None,
            secret_key: None,
            verify_url: default_verify_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl ChallengeConfig {
    /// Whether the challenge check should be enforced.
    ///
    /// Both keys must be present and non-empty. A missing key disables the
    /// check rather than failing requests.
    pub fn is_enabled(&self) -> bool {
        non_empty(&self.site_key) && non_empty(&self.secret_key)
    }

    /// Get the outbound request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// - `BIND_ADDR`: Server bind address
    /// - `RATE_LIMIT_WINDOW_MS`, `RATE_LIMIT_MAX_REQUESTS`,
    ///   `RATE_LIMIT_SKIP_SUCCESSFUL`: rate limit policy
    /// - `TURNSTILE_SITE_KEY`, `TURNSTILE_SECRET_KEY`: challenge keys
    /// - `TURNSTILE_VERIFY_URL`, `TURNSTILE_TIMEOUT_MS`: verification endpoint
    /// - `METRICS_ENABLED`: expose `/metrics`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, starting from the
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(v) = parse_var("RATE_LIMIT_WINDOW_MS", get("RATE_LIMIT_WINDOW_MS"))? {
            config.rate_limit.window_ms = v;
        }
        if let Some(v) = parse_var("RATE_LIMIT_MAX_REQUESTS", get("RATE_LIMIT_MAX_REQUESTS"))? {
            config.rate_limit.max_requests = v;
        }
        if let Some(raw) = get("RATE_LIMIT_SKIP_SUCCESSFUL") {
            config.rate_limit.skip_successful_requests =
                parse_flag("RATE_LIMIT_SKIP_SUCCESSFUL", raw)?;
        }

        config.challenge.site_key = get("TURNSTILE_SITE_KEY");
        config.challenge.secret_key = get("TURNSTILE_SECRET_KEY");
        if let Some(url) = get("TURNSTILE_VERIFY_URL") {
            config.challenge.verify_url = url;
        }
        if let Some(v) = parse_var("TURNSTILE_TIMEOUT_MS", get("TURNSTILE_TIMEOUT_MS"))? {
            config.challenge.timeout_ms = v;
        }

        if let Some(raw) = get("METRICS_ENABLED") {
            config.metrics.enabled = parse_flag("METRICS_ENABLED", raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the guards cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.window_ms == 0 {
            return Err(GatewayError::Config(
                "rate limit window must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(GatewayError::Config(
                "rate limit quota must be greater than zero".to_string(),
            ));
        }
        if self.challenge.timeout_ms == 0 {
            return Err(GatewayError::Config(
                "challenge timeout must be greater than zero".to_string(),
            ));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(GatewayError::Config(format!(
                "metrics path must start with '/': {}",
                self.metrics.path
            )));
        }

        let url = Url::parse(&self.challenge.verify_url).map_err(|source| {
            GatewayError::InvalidVerifyUrl {
                url: self.challenge.verify_url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::Config(format!(
                "verification endpoint must be http(s): {}",
                self.challenge.verify_url
            )));
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: Option<String>) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(GatewayError::InvalidEnv { var, value }),
        },
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GatewayError::InvalidEnv { var, value }),
    }
}
