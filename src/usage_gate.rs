// ABOUTME: Pure quota logic for training decisions: day normalization, gate checks, consumption
// ABOUTME: No clocks and no I/O; callers supply the current instant and the stored counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Usage Gate
//!
//! Everything in this module is a pure function over explicit inputs: the
//! caller passes `now` and a timezone offset, and gets back values it can
//! persist or refuse. That keeps the whole quota policy testable at any
//! simulated instant and lets the store run gate logic inside a transaction.
//!
//! The timezone offset follows the mobile client's convention: minutes the
//! user's local time lags UTC, so New York in winter is `300` and Berlin in
//! summer is `-120`. Local time is `UTC - offset`.

use crate::constants::limits;
use crate::models::{
    DecisionUsage, Entitlement, GateDenial, GateVerdict, StoredDecisionUsage, UsageStatus,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// The user's local calendar day at the given instant
#[must_use]
pub fn local_day(now: DateTime<Utc>, tz_offset_minutes: i32) -> NaiveDate {
    (now - Duration::minutes(i64::from(tz_offset_minutes))).date_naive()
}

/// First instant after `daily_date` ends in the user's local timezone
///
/// This is when a daily limit lifts: local midnight of the following day,
/// expressed in UTC.
#[must_use]
pub fn next_local_midnight(daily_date: NaiveDate, tz_offset_minutes: i32) -> DateTime<Utc> {
    let next_day = daily_date.succ_opt().unwrap_or(NaiveDate::MAX);
    let local_midnight = next_day.and_time(NaiveTime::MIN);
    let utc_naive = match local_midnight.checked_add_signed(Duration::minutes(i64::from(tz_offset_minutes))) {
        Some(instant) => instant,
        None => {
            tracing::warn!(
                tz_offset_minutes,
                "timezone offset overflowed next-midnight math; using unshifted midnight"
            );
            local_midnight
        }
    };
    Utc.from_utc_datetime(&utc_naive)
}

/// Bring stored counters up to date for the user's current local day
///
/// Missing fields take their defaults: a full trial allowance and a zero
/// daily count. When the stored day is not today (older, in the future, or
/// absent), the daily count resets and the record is pinned to today.
/// `free_remaining` and `last_decision_at` always survive a rollover: trial
/// credits are lifetime, and the last-decision instant is day-independent.
///
/// The supplied offset is written into the result in both branches, so a
/// user who traveled since the last write gets their new timezone recorded
/// even when the day has not changed. Normalizing an already-normalized
/// record at the same instant is a no-op.
#[must_use]
pub fn normalize_usage(
    stored: &StoredDecisionUsage,
    now: DateTime<Utc>,
    tz_offset_minutes: i32,
) -> DecisionUsage {
    let today = local_day(now, tz_offset_minutes);
    let free_remaining = stored.free_remaining.unwrap_or(limits::FREE_TRIAL_DECISIONS);

    match stored.daily_date {
        Some(stored_day) if stored_day == today => DecisionUsage {
            free_remaining,
            daily_count: stored.daily_count.unwrap_or(0),
            daily_date: stored_day,
            tz_offset_minutes,
            last_decision_at: stored.last_decision_at,
        },
        _ => DecisionUsage {
            free_remaining,
            daily_count: 0,
            daily_date: today,
            tz_offset_minutes,
            last_decision_at: stored.last_decision_at,
        },
    }
}

/// Record one consumed decision on top of normalized counters
///
/// Normalizes first, then increments the daily count, stamps
/// `last_decision_at`, and burns a trial credit for unsubscribed users.
/// The credit decrement saturates at zero; subscribers never spend credits.
#[must_use]
pub fn apply_usage(
    entitlement: Entitlement,
    stored: &StoredDecisionUsage,
    now: DateTime<Utc>,
    tz_offset_minutes: i32,
) -> DecisionUsage {
    let mut usage = normalize_usage(stored, now, tz_offset_minutes);
    usage.daily_count += 1;
    usage.last_decision_at = Some(now);
    if !entitlement.is_subscribed {
        usage.free_remaining = usage.free_remaining.saturating_sub(1);
    }
    usage
}

/// Decide whether a decision request may proceed right now
///
/// `usage` must already be normalized to the user's current local day.
/// Checks run in a fixed order and the first failure wins:
///
/// 1. Unsubscribed with zero trial credits left denies `FREE_EXHAUSTED`,
///    regardless of the daily count.
/// 2. A daily count at or over the tier ceiling denies `FREE_DAILY_LIMIT`
///    or `PAID_DAILY_LIMIT`, lifting at the next local midnight.
/// 3. Subscribers inside the spacing window deny `COOLDOWN`. Elapsed time
///    equal to the window allows; unsubscribed users are never cooled down.
///
/// Evaluation never mutates anything: consumption is a separate step so the
/// store can refuse without writing.
#[must_use]
pub fn evaluate_gate(
    entitlement: Entitlement,
    usage: &DecisionUsage,
    now: DateTime<Utc>,
) -> GateVerdict {
    if !entitlement.is_subscribed && usage.free_remaining == 0 {
        return GateVerdict::Denied(GateDenial::FreeExhausted);
    }

    if usage.daily_count >= entitlement.daily_limit() {
        let next_available_at = next_local_midnight(usage.daily_date, usage.tz_offset_minutes);
        let denial = if entitlement.is_subscribed {
            GateDenial::PaidDailyLimit { next_available_at }
        } else {
            GateDenial::FreeDailyLimit { next_available_at }
        };
        return GateVerdict::Denied(denial);
    }

    if entitlement.is_subscribed {
        if let Some(last_decision_at) = usage.last_decision_at {
            let window = Duration::minutes(limits::COOLDOWN_MINUTES);
            let elapsed = now - last_decision_at;
            if elapsed < window {
                return GateVerdict::Denied(GateDenial::Cooldown {
                    next_available_at: last_decision_at + window,
                    cooldown_remaining_ms: (window - elapsed).num_milliseconds(),
                });
            }
        }
    }

    GateVerdict::Allowed
}

/// Read-only quota snapshot for usage meters and paywall screens
///
/// `usage` must already be normalized. Consumes nothing.
#[must_use]
pub fn calculate_usage_status(
    entitlement: Entitlement,
    usage: &DecisionUsage,
    now: DateTime<Utc>,
) -> UsageStatus {
    let verdict = evaluate_gate(entitlement, usage, now);
    let next_available_at = match &verdict {
        GateVerdict::Allowed => None,
        GateVerdict::Denied(denial) => denial.next_available_at(),
    };

    UsageStatus {
        subscribed: entitlement.is_subscribed,
        daily_limit: entitlement.daily_limit(),
        remaining_today: entitlement.daily_limit().saturating_sub(usage.daily_count),
        free_remaining: (!entitlement.is_subscribed).then_some(usage.free_remaining),
        can_request_now: verdict.is_allowed(),
        next_available_at,
    }
}
