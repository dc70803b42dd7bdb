// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for submission flood simulation.
//!
//! Replays synthetic traffic against the guards on a simulated clock and
//! collects the outcomes.

pub mod attacks;
pub mod generators;
pub mod metrics;
