// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the guards.
//!
//! Each [`GatewayMetrics`] owns its registry so independent instances (and
//! tests) never collide on metric names.

use crate::error::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

pub struct GatewayMetrics {
    registry: Registry,
    rate_limit: IntCounterVec,
    challenge: IntCounterVec,
    challenge_latency: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let rate_limit = IntCounterVec::new(
            Opts::new(
                "submission_guard_rate_limit_total",
                "Rate limit decisions by result",
            ),
            &["result"],
        )?;
        let challenge = IntCounterVec::new(
            Opts::new(
                "submission_guard_challenge_total",
                "Challenge verifications by result",
            ),
            &["result"],
        )?;
        let challenge_latency = Histogram::with_opts(HistogramOpts::new(
            "submission_guard_challenge_seconds",
            "Challenge verification latency in seconds",
        ))?;

        registry.register(Box::new(rate_limit.clone()))?;
        registry.register(Box::new(challenge.clone()))?;
        registry.register(Box::new(challenge_latency.clone()))?;

        Ok(Self {
            registry,
            rate_limit,
            challenge,
            challenge_latency,
        })
    }

    pub fn record_rate_limit(&self, allowed: bool) {
        let result = if allowed { "allowed" } else { "limited" };
        self.rate_limit.with_label_values(&[result]).inc();
    }

    pub fn record_challenge(&self, success: bool, seconds: f64) {
        let result = if success { "success" } else { "failure" };
        self.challenge.with_label_values(&[result]).inc();
        self.challenge_latency.observe(seconds);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %err, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
