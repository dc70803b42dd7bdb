// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Traffic patterns for flood simulation.

use std::time::Duration;

/// How user agents are assigned to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRotation {
    /// One agent for every request
    Fixed,
    /// Cycle through agents differing in their leading bytes
    Distinct(usize),
    /// Cycle through browser agents sharing a long common prefix
    SharedPrefix(usize),
}

/// Traffic pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated gap between consecutive requests
    pub interval: Duration,
    /// Number of unique client addresses
    pub unique_ips: usize,
    /// User agent assignment
    pub agents: AgentRotation,
    /// Share of requests carrying a challenge token (0.0-1.0)
    pub with_token_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval: Duration::from_millis(100),
            unique_ips: 1,
            agents: AgentRotation::Fixed,
            with_token_ratio: 1.0,
        }
    }
}

/// Predefined traffic patterns.
impl AttackConfig {
    /// Single client flood - one address, one agent, 10 rps.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 200,
            ..Default::default()
        }
    }

    /// Distributed attack - many addresses, a few requests each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 1000,
            interval: Duration::from_millis(10),
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// One address rotating user agents to multiply its quota.
    pub fn agent_rotation() -> Self {
        Self {
            total_requests: 200,
            agents: AgentRotation::Distinct(10),
            ..Default::default()
        }
    }

    /// One address rotating browser agents that share a prefix.
    pub fn browser_agent_rotation() -> Self {
        Self {
            total_requests: 200,
            agents: AgentRotation::SharedPrefix(10),
            ..Default::default()
        }
    }

    /// Bots posting without solving the challenge.
    pub fn tokenless_bots() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 50,
            with_token_ratio: 0.0,
            ..Default::default()
        }
    }

    /// Slow drip - one submission every four minutes for two hours.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            interval: Duration::from_secs(240),
            ..Default::default()
        }
    }

    /// Simulated span covered by the traffic.
    pub fn expected_duration(&self) -> Duration {
        self.interval * self.total_requests as u32
    }
}
