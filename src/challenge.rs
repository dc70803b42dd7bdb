// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Challenge token verification against a remote siteverify service.
//!
//! Verification never fails with an error. A missing token, a transport
//! failure, a timeout, a non-2xx status or an unreadable body all come back
//! as a failed [`VerificationOutcome`], so callers have a single branch to
//! reject on.

use crate::config::ChallengeConfig;
use crate::error::{GatewayError, Result};
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Error codes reported by the verification service, or synthesized locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    MissingInputSecret,
    InvalidInputSecret,
    MissingInputResponse,
    InvalidInputResponse,
    BadRequest,
    TimeoutOrDuplicate,
    InternalError,
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::MissingInputSecret => "missing-input-secret",
            ErrorCode::InvalidInputSecret => "invalid-input-secret",
            ErrorCode::MissingInputResponse => "missing-input-response",
            ErrorCode::InvalidInputResponse => "invalid-input-response",
            ErrorCode::BadRequest => "bad-request",
            ErrorCode::TimeoutOrDuplicate => "timeout-or-duplicate",
            ErrorCode::InternalError => "internal-error",
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "missing-input-secret" => ErrorCode::MissingInputSecret,
            "invalid-input-secret" => ErrorCode::InvalidInputSecret,
            "missing-input-response" => ErrorCode::MissingInputResponse,
            "invalid-input-response" => ErrorCode::InvalidInputResponse,
            "bad-request" => ErrorCode::BadRequest,
            "timeout-or-duplicate" => ErrorCode::TimeoutOrDuplicate,
            "internal-error" => ErrorCode::InternalError,
            _ => ErrorCode::Other(code),
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying a challenge token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The service confirmed the token
    Success {
        challenge_ts: Option<String>,
        hostname: Option<String>,
        error_codes: Vec<ErrorCode>,
    },
    /// The token was rejected or could not be checked
    Failure {
        error_codes: Vec<ErrorCode>,
        challenge_ts: Option<String>,
        hostname: Option<String>,
    },
}

impl VerificationOutcome {
    /// A locally synthesized failure carrying a single code.
    pub fn failure(code: ErrorCode) -> Self {
        VerificationOutcome::Failure {
            error_codes: vec![code],
            challenge_ts: None,
            hostname: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success { .. })
    }

    pub fn error_codes(&self) -> &[ErrorCode] {
        match self {
            VerificationOutcome::Success { error_codes, .. }
            | VerificationOutcome::Failure { error_codes, .. } => error_codes,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            VerificationOutcome::Success { hostname, .. }
            | VerificationOutcome::Failure { hostname, .. } => hostname.as_deref(),
        }
    }

    pub fn challenge_ts(&self) -> Option<&str> {
        match self {
            VerificationOutcome::Success { challenge_ts, .. }
            | VerificationOutcome::Failure { challenge_ts, .. } => challenge_ts.as_deref(),
        }
    }
}

/// Body returned by the siteverify endpoint.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<ErrorCode>,
    #[serde(default, rename = "challenge-ts", alias = "challenge_ts")]
    challenge_ts: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
}

impl From<SiteverifyResponse> for VerificationOutcome {
    fn from(body: SiteverifyResponse) -> Self {
        if body.success {
            VerificationOutcome::Success {
                challenge_ts: body.challenge_ts,
                hostname: body.hostname,
                error_codes: body.error_codes,
            }
        } else {
            VerificationOutcome::Failure {
                error_codes: body.error_codes,
                challenge_ts: body.challenge_ts,
                hostname: body.hostname,
            }
        }
    }
}

/// Internal failures of the outbound call. Never leaves this module.
#[derive(Debug, Error)]
enum SiteverifyError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Verifies challenge tokens with the remote service.
///
/// Holds no per-call state, so one instance can serve concurrent requests.
pub struct ChallengeVerifier {
    client: reqwest::Client,
    secret_key: String,
    verify_url: Url,
}

impl fmt::Debug for ChallengeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeVerifier")
            .field("verify_url", &self.verify_url.as_str())
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl ChallengeVerifier {
    /// Create a verifier from configuration.
    ///
    /// Fails if no secret key is configured or the endpoint is not a URL.
    pub fn new(config: &ChallengeConfig) -> Result<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GatewayError::MissingSecretKey)?;

        let verify_url =
            Url::parse(&config.verify_url).map_err(|source| GatewayError::InvalidVerifyUrl {
                url: config.verify_url.clone(),
                source,
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            secret_key,
            verify_url,
        })
    }

    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Verify a challenge token, optionally binding it to the client address.
    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> VerificationOutcome {
        let token = match token {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                debug!("Challenge token missing");
                return VerificationOutcome::failure(ErrorCode::MissingInputResponse);
            }
        };

        match self.siteverify(token, remote_ip).await {
            Ok(body) => {
                let outcome = VerificationOutcome::from(body);
                debug!(
                    success = outcome.is_success(),
                    hostname = ?outcome.hostname(),
                    error_codes = ?outcome.error_codes(),
                    "Challenge verified"
                );
                outcome
            }
            Err(err) => {
                warn!(error = %err, url = %self.verify_url, "Challenge verification failed");
                VerificationOutcome::failure(ErrorCode::InternalError)
            }
        }
    }

    async fn siteverify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> std::result::Result<SiteverifyResponse, SiteverifyError> {
        let mut form = Form::new()
            .text("secret", self.secret_key.clone())
            .text("response", token.to_string());

        if let Some(ip) = remote_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
            form = form.text("remoteip", ip.to_string());
        }

        let response = self
            .client
            .post(self.verify_url.clone())
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
