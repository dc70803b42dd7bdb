// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for flood simulation results.

use std::collections::HashMap;
use std::time::Duration;

/// Collects metrics during a simulated flood.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of requests by client address
    requests_per_ip: HashMap<String, usize>,
    /// Largest retry hint handed out
    max_retry_after_secs: u64,
    /// Simulated span covered by the traffic
    simulated: Duration,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    ChallengeRejected,
}

impl AttackMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, ip: &str, retry_after_secs: Option<u64>) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        if let Some(secs) = retry_after_secs {
            self.max_retry_after_secs = self.max_retry_after_secs.max(secs);
        }
    }

    pub fn set_simulated(&mut self, span: Duration) {
        self.simulated = span;
    }

    /// Get total request count.
    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Get block rate (ratio of blocked to total).
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            challenge_rejected: self.count(Outcome::ChallengeRejected),
            block_rate: self.block_rate(),
            max_retry_after_secs: self.max_retry_after_secs,
            simulated_secs: self.simulated.as_secs(),
            unique_ips: self.requests_per_ip.len(),
        }
    }
}

/// Summary report of flood metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub challenge_rejected: usize,
    pub block_rate: f64,
    pub max_retry_after_secs: u64,
    pub simulated_secs: u64,
    pub unique_ips: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Flood Metrics Report ===")?;
        writeln!(f, "Simulated span:     {} s", self.simulated_secs)?;
        writeln!(f, "Total Requests:     {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Allowed:            {}", self.allowed)?;
        writeln!(f, "Rate Limited:       {}", self.rate_limited)?;
        writeln!(f, "Challenge Rejected: {}", self.challenge_rejected)?;
        writeln!(f, "Block Rate:         {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Max Retry-After:    {} s", self.max_retry_after_secs)?;
        writeln!(f)?;
        writeln!(f, "Unique IPs:         {}", self.unique_ips)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1", None);
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1", Some(30));
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
        assert_eq!(metrics.report().max_retry_after_secs, 30);
    }
}
