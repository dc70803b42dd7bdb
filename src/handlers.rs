// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the submission guard service.
//!
//! The guards can be used in two ways: a reverse proxy calls `/check` with
//! the client details before forwarding, or the contact form posts straight
//! to `/submit` and the service gates it itself.

use crate::challenge::{ChallengeVerifier, ErrorCode, VerificationOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::fingerprint::{get_client_ip, ClientFingerprint};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::GatewayMetrics;
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    /// Present only when both challenge keys are configured
    pub verifier: Option<ChallengeVerifier>,
    pub metrics: GatewayMetrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let verifier = if config.challenge.is_enabled() {
            Some(ChallengeVerifier::new(&config.challenge)?)
        } else {
            None
        };

        Ok(Self {
            limiter: RateLimiter::new(config.rate_limit.clone()),
            verifier,
            metrics: GatewayMetrics::new()?,
            config,
        })
    }

    /// Run the challenge check, timing it. `None` when the check is disabled.
    async fn verify_challenge(
        &self,
        token: Option<&str>,
        remote_ip: &str,
    ) -> Option<VerificationOutcome> {
        let verifier = self.verifier.as_ref()?;
        let started = Instant::now();
        let remote_ip = Some(remote_ip).filter(|ip| !ip.is_empty());
        let outcome = verifier.verify(token, remote_ip).await;
        self.metrics
            .record_challenge(outcome.is_success(), started.elapsed().as_secs_f64());
        Some(outcome)
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/challenge/config", get(challenge_config))
        .route("/check", post(check))
        .route("/submit", post(submit));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<ErrorCode>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Public challenge settings for the form front end.
#[derive(Debug, Serialize)]
pub struct ChallengeConfigResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_key: Option<String>,
}

/// Guard check request (for external validation).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub ip: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Guard check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<ErrorCode>,
    pub remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    pub reset_at: DateTime<Utc>,
}

/// Contact form submission. Only the challenge token is inspected here.
#[derive(Debug, Deserialize)]
pub struct ContactSubmission {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "cf-turnstile-response")]
    pub token: Option<String>,
}

/// Accepted submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub remaining: u32,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "submission-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Report whether the challenge is enforced, and the site key to render it.
pub async fn challenge_config(State(state): State<Arc<AppState>>) -> Json<ChallengeConfigResponse> {
    let enabled = state.verifier.is_some();
    Json(ChallengeConfigResponse {
        enabled,
        site_key: state.config.challenge.site_key.clone().filter(|_| enabled),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
}

/// Check rate limit and challenge for a submission on behalf of a proxy.
///
/// Always answers 200 so the proxy can read the decision from the body.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    debug!(
        ip = %req.ip,
        user_agent = ?req.user_agent,
        has_token = req.token.is_some(),
        "Processing guard check"
    );

    let fingerprint = ClientFingerprint::from_parts(&req.ip, req.user_agent.as_deref());
    let rate = state.limiter.check(&fingerprint).await;
    state.metrics.record_rate_limit(rate.is_allowed());
    let reset_at = wall_clock(&rate);

    if let RateLimitResult::Limited { retry_after_secs, .. } = rate {
        info!(ip = %req.ip, retry_after_secs, "Submission rate limited");
        return Json(CheckResponse {
            allowed: false,
            reason: Some("rate_limited"),
            error_codes: Vec::new(),
            remaining: 0,
            retry_after_secs: Some(retry_after_secs),
            reset_at,
        });
    }

    if let Some(outcome) = state.verify_challenge(req.token.as_deref(), &req.ip).await {
        if !outcome.is_success() {
            info!(ip = %req.ip, error_codes = ?outcome.error_codes(), "Challenge rejected");
            return Json(CheckResponse {
                allowed: false,
                reason: Some("challenge_failed"),
                error_codes: outcome.error_codes().to_vec(),
                remaining: rate.remaining(),
                retry_after_secs: None,
                reset_at,
            });
        }
    }

    Json(CheckResponse {
        allowed: true,
        reason: None,
        error_codes: Vec::new(),
        remaining: rate.remaining(),
        retry_after_secs: None,
        reset_at,
    })
}

/// Gate a contact form submission.
///
/// Rate limit first, then the challenge. Storing the lead is left to the
/// application behind this service.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(submission): Form<ContactSubmission>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let ip = get_client_ip(&headers, peer);

    let rate = state.limiter.check_request(&headers, peer).await;
    state.metrics.record_rate_limit(rate.is_allowed());
    let limit_headers = rate_limit_headers(state.limiter.config().max_requests, &rate);

    if let RateLimitResult::Limited { retry_after_secs, .. } = rate {
        info!(ip = %ip, retry_after_secs, "Submission rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            limit_headers,
            [("retry-after", retry_after_secs.to_string())],
            Json(ErrorResponse {
                error: "Too many submissions, try again later".to_string(),
                code: "RATE_LIMITED",
                retry_after_secs: Some(retry_after_secs),
                error_codes: Vec::new(),
            }),
        )
            .into_response();
    }

    if let Some(outcome) = state.verify_challenge(submission.token.as_deref(), &ip).await {
        if !outcome.is_success() {
            info!(ip = %ip, error_codes = ?outcome.error_codes(), "Challenge rejected");
            return (
                StatusCode::FORBIDDEN,
                limit_headers,
                Json(ErrorResponse {
                    error: "Challenge verification failed".to_string(),
                    code: "CHALLENGE_FAILED",
                    retry_after_secs: None,
                    error_codes: outcome.error_codes().to_vec(),
                }),
            )
                .into_response();
        }
    }

    info!(
        ip = %ip,
        has_email = !submission.email.is_empty(),
        message_len = submission.message.len(),
        "Submission accepted"
    );
    (
        StatusCode::ACCEPTED,
        limit_headers,
        Json(SubmitResponse {
            accepted: true,
            remaining: rate.remaining(),
        }),
    )
        .into_response()
}

fn rate_limit_headers(limit: u32, rate: &RateLimitResult) -> [(&'static str, String); 3] {
    [
        ("x-ratelimit-limit", limit.to_string()),
        ("x-ratelimit-remaining", rate.remaining().to_string()),
        (
            "x-ratelimit-reset",
            rate.reset_in_secs(Instant::now()).to_string(),
        ),
    ]
}

fn wall_clock(rate: &RateLimitResult) -> DateTime<Utc> {
    let reset_in = chrono::Duration::from_std(rate.reset_in(Instant::now()))
        .unwrap_or_else(|_| chrono::Duration::zero());
    Utc::now() + reset_in
}
