// ABOUTME: Per-user quota models: entitlement, decision counters, and gate outcomes
// ABOUTME: Stored counters deserialize leniently so stale or hand-edited documents never wedge the gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

use crate::constants::limits;
use crate::errors::AdvisorError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Subscription entitlement for a user, written by billing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entitlement {
    /// Whether billing currently grants the subscriber tier
    pub is_subscribed: bool,
}

impl Entitlement {
    /// Daily decision ceiling for this tier
    #[must_use]
    pub const fn daily_limit(&self) -> u32 {
        if self.is_subscribed {
            limits::PAID_MAX_PER_DAY
        } else {
            limits::FREE_MAX_PER_DAY
        }
    }
}

/// Trusted per-user decision counters
///
/// Values of this type are always normalized: `daily_date` is the user's
/// current local day and every field is present. They are produced by the
/// usage gate from [`StoredDecisionUsage`] and written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionUsage {
    /// Lifetime trial credits left; only meaningful while unsubscribed
    pub free_remaining: u32,
    /// Decisions consumed during the current local day
    pub daily_count: u32,
    /// Local calendar day the daily count belongs to
    pub daily_date: NaiveDate,
    /// Minutes the user's local time lags UTC (positive west of Greenwich)
    pub tz_offset_minutes: i32,
    /// When the user last consumed a decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_decision_at: Option<DateTime<Utc>>,
}

impl DecisionUsage {
    /// Fresh counters for a user with no history, pinned to the given local day
    #[must_use]
    pub const fn fresh(daily_date: NaiveDate, tz_offset_minutes: i32) -> Self {
        Self {
            free_remaining: limits::FREE_TRIAL_DECISIONS,
            daily_count: 0,
            daily_date,
            tz_offset_minutes,
            last_decision_at: None,
        }
    }
}

/// Raw decision counters as read from the document store
///
/// Every field is optional and deserialization is lenient: a field holding
/// the wrong JSON type reads as absent instead of failing the whole document.
/// Users created before the gate shipped, or documents edited by support
/// tooling, therefore normalize cleanly instead of erroring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredDecisionUsage {
    /// Lifetime trial credits left, if ever written
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_counter"
    )]
    pub free_remaining: Option<u32>,
    /// Decisions consumed on `daily_date`, if ever written
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_counter"
    )]
    pub daily_count: Option<u32>,
    /// Local day the counters belong to, if ever written
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub daily_date: Option<NaiveDate>,
    /// Timezone offset recorded at the last write, if ever written
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_offset"
    )]
    pub tz_offset_minutes: Option<i32>,
    /// Timestamp of the last consumed decision, if any
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub last_decision_at: Option<DateTime<Utc>>,
}

impl From<DecisionUsage> for StoredDecisionUsage {
    fn from(usage: DecisionUsage) -> Self {
        Self {
            free_remaining: Some(usage.free_remaining),
            daily_count: Some(usage.daily_count),
            daily_date: Some(usage.daily_date),
            tz_offset_minutes: Some(usage.tz_offset_minutes),
            last_decision_at: usage.last_decision_at,
        }
    }
}

/// The `usage` subtree of a user document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSection {
    /// Decision-gate counters, stored under `usage.decisions`
    pub decisions: StoredDecisionUsage,
}

/// A user's persisted document, as the advisor sees it
///
/// Deserialization ignores sibling subtrees owned by other services; writes
/// go through the document store's merge operations so those siblings are
/// never clobbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDocument {
    /// Billing-owned entitlement subtree
    pub entitlement: Entitlement,
    /// Advisor-owned usage subtree
    pub usage: UsageSection,
}

// ============================================================================
// Gate outcomes
// ============================================================================

/// Why a decision request was refused
///
/// Serializes with a stable `reason` tag so API layers can pass denials to
/// clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason")]
pub enum GateDenial {
    /// Unsubscribed user has spent every lifetime trial credit
    #[serde(rename = "FREE_EXHAUSTED")]
    FreeExhausted,
    /// Unsubscribed user already consumed today's decision
    #[serde(rename = "FREE_DAILY_LIMIT", rename_all = "camelCase")]
    FreeDailyLimit {
        /// Next local midnight, when the daily count resets
        next_available_at: DateTime<Utc>,
    },
    /// Subscribed user hit the per-day ceiling
    #[serde(rename = "PAID_DAILY_LIMIT", rename_all = "camelCase")]
    PaidDailyLimit {
        /// Next local midnight, when the daily count resets
        next_available_at: DateTime<Utc>,
    },
    /// Subscribed user asked again inside the spacing window
    #[serde(rename = "COOLDOWN", rename_all = "camelCase")]
    Cooldown {
        /// When the spacing window ends
        next_available_at: DateTime<Utc>,
        /// Milliseconds until the spacing window ends
        cooldown_remaining_ms: i64,
    },
}

impl GateDenial {
    /// Stable reason code, identical to the serde tag
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::FreeExhausted => "FREE_EXHAUSTED",
            Self::FreeDailyLimit { .. } => "FREE_DAILY_LIMIT",
            Self::PaidDailyLimit { .. } => "PAID_DAILY_LIMIT",
            Self::Cooldown { .. } => "COOLDOWN",
        }
    }

    /// When the denial lifts, if it ever does
    ///
    /// `FREE_EXHAUSTED` returns `None`: trial credits never replenish.
    #[must_use]
    pub const fn next_available_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::FreeExhausted => None,
            Self::FreeDailyLimit { next_available_at }
            | Self::PaidDailyLimit { next_available_at }
            | Self::Cooldown {
                next_available_at, ..
            } => Some(*next_available_at),
        }
    }

    /// Short user-facing copy for this denial
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::FreeExhausted => {
                "You've used all your free adjustments. Subscribe to keep getting daily guidance."
            }
            Self::FreeDailyLimit { .. } => {
                "You've used today's free adjustment. Check back tomorrow."
            }
            Self::PaidDailyLimit { .. } => {
                "You've hit today's adjustment limit. Check back tomorrow."
            }
            Self::Cooldown { .. } => "Give it a little time before asking again.",
        }
    }

    /// Map this denial to a quota error for API edges that want one
    #[must_use]
    pub fn to_error(&self) -> AdvisorError {
        AdvisorError::quota_exceeded(self.user_message()).with_details(serde_json::json!({
            "reason": self.reason_code(),
            "nextAvailableAt": self.next_available_at(),
        }))
    }
}

/// Result of a pure gate evaluation against normalized counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// The request may proceed and consume quota
    Allowed,
    /// The request must be refused; nothing may be consumed
    Denied(GateDenial),
}

impl GateVerdict {
    /// True when the request may proceed
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Outcome of an atomic gate-and-consume settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Quota was consumed
    Granted {
        /// Counters after the consumption was applied
        usage: DecisionUsage,
    },
    /// Quota was not consumed
    Denied(GateDenial),
}

impl GateOutcome {
    /// True when quota was consumed
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Stable reason code: `OK` for grants, the denial code otherwise
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Granted { .. } => "OK",
            Self::Denied(denial) => denial.reason_code(),
        }
    }
}

/// Read-only snapshot of a user's quota position
///
/// Computed without consuming anything, for usage meters and paywall screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatus {
    /// Whether the user holds the subscriber tier
    pub subscribed: bool,
    /// Daily decision ceiling for the user's tier
    pub daily_limit: u32,
    /// Decisions still available today
    pub remaining_today: u32,
    /// Lifetime trial credits left; `None` for subscribers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_remaining: Option<u32>,
    /// Whether a request made right now would be granted
    pub can_request_now: bool,
    /// When the next request becomes possible, if currently blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_available_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Lenient field deserializers
// ============================================================================

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_counter<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_u64().and_then(|n| u32::try_from(n).ok())),
        other => {
            tracing::debug!(kind = json_kind(other), "ignoring non-numeric usage counter");
            Ok(None)
        }
    }
}

fn lenient_offset<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_i64().and_then(|n| i32::try_from(n).ok())),
        other => {
            tracing::debug!(kind = json_kind(other), "ignoring non-numeric timezone offset");
            Ok(None)
        }
    }
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(date) => Ok(Some(date)),
            Err(_) => {
                tracing::debug!("ignoring unparseable stored day; counters will roll over");
                Ok(None)
            }
        },
        other => {
            tracing::debug!(kind = json_kind(other), "ignoring non-string stored day");
            Ok(None)
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))),
        other => {
            tracing::debug!(kind = json_kind(other), "ignoring non-string timestamp");
            Ok(None)
        }
    }
}
