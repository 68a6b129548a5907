// ABOUTME: Centralized tuning constants for the Milo training advisor
// ABOUTME: Quota limits, heuristic thresholds, and explanation caps in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Advisor Constants
//!
//! Every number the advisor's behavior hangs on lives here, grouped by the
//! layer that consumes it. Changing a value changes product behavior, so each
//! constant documents what it controls.

/// Quota and pacing limits enforced by the usage gate
pub mod limits {
    /// Lifetime trial decisions granted to unsubscribed users
    pub const FREE_TRIAL_DECISIONS: u32 = 3;

    /// Daily decision ceiling for unsubscribed users
    pub const FREE_MAX_PER_DAY: u32 = 1;

    /// Daily decision ceiling for subscribed users
    pub const PAID_MAX_PER_DAY: u32 = 3;

    /// Minimum spacing between decisions for subscribed users, in minutes
    ///
    /// Unsubscribed users are not subject to a cooldown: their single daily
    /// decision makes spacing moot.
    pub const COOLDOWN_MINUTES: i64 = 30;

    /// Intensity adjustment steps the trusted schema accepts, in percent
    pub const ALLOWED_INTENSITY_STEPS: [i32; 4] = [-20, -10, 10, 20];
}

/// Thresholds driving the deterministic training heuristic
pub mod heuristic {
    /// Sleep below this many hours forces a pull-back day
    pub const LOW_SLEEP_HOURS: f64 = 6.0;

    /// Fatigue at or above this level forces a pull-back day
    pub const HIGH_FATIGUE: f64 = 7.0;

    /// Soreness at or above this level forces a pull-back day
    pub const HIGH_SORENESS: f64 = 7.0;

    /// Minimum sleep hours required to consider a push day
    pub const PUSH_MIN_SLEEP_HOURS: f64 = 7.0;

    /// Maximum fatigue tolerated on a push day
    pub const PUSH_MAX_FATIGUE: f64 = 4.0;

    /// Minimum motivation required for a push day
    pub const PUSH_MIN_MOTIVATION: f64 = 7.0;

    /// Intensity change applied on a push day, in percent
    pub const PUSH_INTENSITY_PCT: i32 = 20;

    /// Intensity change applied on a pull-back day, in percent
    pub const PULL_BACK_INTENSITY_PCT: i32 = -20;
}

/// Caps on recommendation explanation bullets
pub mod explanation {
    /// Fewest bullets a trusted explanation may carry
    pub const MIN_BULLETS: usize = 2;

    /// Most bullets a trusted explanation may carry
    pub const MAX_BULLETS: usize = 4;

    /// Per-bullet character cap, counted in Unicode scalar values
    pub const MAX_BULLET_CHARS: usize = 140;

    /// Combined character cap across all bullets
    pub const MAX_TOTAL_CHARS: usize = 600;
}

/// Service identities used in logs and configuration
pub mod service_names {
    /// Canonical name of the advisor service
    pub const MILO_ADVISOR: &str = "milo-advisor";
}
