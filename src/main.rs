// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission Guard Service
//!
//! Gates contact form submissions behind a per-client rate limit and a
//! challenge (Turnstile) verification.
//!
//! ## Usage
//!
//! 1. **External auth service**: a reverse proxy calls `/check` with the
//!    client address, user agent and token before forwarding.
//!
//! 2. **Direct**: the form posts to `/submit`, which answers 429, 403 or 202.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_WINDOW_MS`: Window length (default: 900000)
//! - `RATE_LIMIT_MAX_REQUESTS`: Submissions per window (default: 5)
//! - `TURNSTILE_SITE_KEY`, `TURNSTILE_SECRET_KEY`: enable the challenge check
//! - `TURNSTILE_TIMEOUT_MS`: Verification timeout (default: 5000)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use submission_guard::{config::Config, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        challenge_enabled = config.challenge.is_enabled(),
        "Starting submission guard"
    );
    if !config.challenge.is_enabled() {
        warn!("TURNSTILE_SITE_KEY or TURNSTILE_SECRET_KEY unset, challenge check disabled");
    }

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(handlers::AppState::new(config)?);

    // Checks sweep expired windows too; this bounds memory when traffic stops.
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = handlers::router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
