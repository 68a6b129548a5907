// ABOUTME: Decision request orchestration: quota gating, provider dispatch, usage reporting
// ABOUTME: Runs the gate inside the store's settlement so charge-and-check is atomic per user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

use crate::errors::{AdvisorError, AdvisorResult};
use crate::intelligence::{resolve_decision, DecisionComputer, DecisionProvider};
use crate::models::{
    DecisionInputs, DecisionOutput, DecisionUsage, GateDenial, GateOutcome, GateVerdict,
    UsageStatus, UserDocument,
};
use crate::store::{DocumentStore, UsagePlan};
use crate::usage_gate;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// Outcome of a full decision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The request was granted and a recommendation produced.
    Granted {
        /// Sanitized recommendation to return to the client.
        recommendation: DecisionOutput,
        /// Usage counters after charging this request.
        usage: DecisionUsage,
    },
    /// The usage gate denied the request; nothing was charged.
    Denied(GateDenial),
}

/// Run the usage gate and, when it allows, charge the request atomically.
///
/// The gate maths run inside the store's settlement callback, so concurrent
/// requests for the same user serialize and each evaluation sees the counters
/// left by the previous grant.
///
/// Business rules:
/// - The stored timezone offset wins; `fallback_tz_offset_minutes` (usually
///   the client's current offset) is used only when the document has none.
/// - A denial leaves the stored document unchanged.
///
/// # Errors
///
/// Returns a `DATABASE_ERROR` when the store settlement fails.
pub async fn gate_and_consume<S>(
    store: &S,
    user_id: Uuid,
    now: DateTime<Utc>,
    fallback_tz_offset_minutes: i32,
) -> AdvisorResult<GateOutcome>
where
    S: DocumentStore + ?Sized,
{
    let plan = store
        .settle_decision(user_id, &|document: &UserDocument| {
            let stored = document.usage.decisions;
            let tz_offset = stored
                .tz_offset_minutes
                .unwrap_or(fallback_tz_offset_minutes);
            let usage = usage_gate::normalize_usage(&stored, now, tz_offset);
            match usage_gate::evaluate_gate(document.entitlement, &usage, now) {
                GateVerdict::Allowed => UsagePlan::Grant(usage_gate::apply_usage(
                    document.entitlement,
                    &stored,
                    now,
                    tz_offset,
                )),
                GateVerdict::Denied(denial) => UsagePlan::Deny(denial),
            }
        })
        .await
        .map_err(|e| {
            AdvisorError::database(format!("usage settlement failed: {e}")).with_user_id(user_id)
        })?;

    match plan {
        UsagePlan::Grant(usage) => {
            info!(
                user_id = %user_id,
                daily_count = usage.daily_count,
                free_remaining = usage.free_remaining,
                "decision granted"
            );
            Ok(GateOutcome::Granted { usage })
        }
        UsagePlan::Deny(denial) => {
            info!(
                user_id = %user_id,
                reason = denial.reason_code(),
                "decision denied"
            );
            Ok(GateOutcome::Denied(denial))
        }
    }
}

/// Full decision request: validate, gate, generate, sanitize.
///
/// Business rules:
/// - Invalid inputs are rejected before the gate, so nothing is charged.
/// - The provider runs only after the quota charge succeeds; a denied request
///   never reaches the provider.
/// - Provider failures and rejected provider output fall back to the built-in
///   heuristic, so a granted request always yields a recommendation.
///
/// # Errors
///
/// Returns `INVALID_INPUT` when a wellness signal is not finite, or a
/// `DATABASE_ERROR` when the store settlement fails.
pub async fn request_decision<S>(
    store: &S,
    provider: &dyn DecisionProvider,
    user_id: Uuid,
    inputs: &DecisionInputs,
    now: DateTime<Utc>,
    fallback_tz_offset_minutes: i32,
) -> AdvisorResult<DecisionOutcome>
where
    S: DocumentStore + ?Sized,
{
    inputs.validate().map_err(|e| e.with_user_id(user_id))?;

    match gate_and_consume(store, user_id, now, fallback_tz_offset_minutes).await? {
        GateOutcome::Granted { usage } => {
            let recommendation = resolve_decision(provider, inputs).await?;
            Ok(DecisionOutcome::Granted {
                recommendation,
                usage,
            })
        }
        GateOutcome::Denied(denial) => Ok(DecisionOutcome::Denied(denial)),
    }
}

/// Compute a recommendation without touching quota or storage.
///
/// Runs the deterministic heuristic only. Useful for previews and for
/// surfaces where the quota question has already been settled.
///
/// # Errors
///
/// Returns `INVALID_INPUT` when a wellness signal is not finite.
pub fn preview_decision(inputs: &DecisionInputs) -> AdvisorResult<DecisionOutput> {
    inputs.validate()?;
    Ok(DecisionComputer::compute(inputs))
}

/// Read-only usage snapshot for a profile or paywall screen.
///
/// Counters are normalized against `now` in memory; the stored document is
/// not modified, so a stale `daily_count` simply reads as zero once local
/// midnight has passed.
///
/// # Errors
///
/// Returns a `DATABASE_ERROR` when the store read fails.
pub async fn usage_status<S>(
    store: &S,
    user_id: Uuid,
    now: DateTime<Utc>,
    fallback_tz_offset_minutes: i32,
) -> AdvisorResult<UsageStatus>
where
    S: DocumentStore + ?Sized,
{
    let document = store
        .get_user_document(user_id)
        .await
        .map_err(|e| {
            AdvisorError::database(format!("document read failed: {e}")).with_user_id(user_id)
        })?
        .unwrap_or_default();

    let stored = document.usage.decisions;
    let tz_offset = stored
        .tz_offset_minutes
        .unwrap_or(fallback_tz_offset_minutes);
    let usage = usage_gate::normalize_usage(&stored, now, tz_offset);
    Ok(usage_gate::calculate_usage_status(
        document.entitlement,
        &usage,
        now,
    ))
}

/// Reset a user's decision usage to a fresh day with full trial credits.
///
/// Support tooling. The write goes through the same settlement path as
/// grants, so merge semantics and sibling preservation hold.
///
/// # Errors
///
/// Returns a `DATABASE_ERROR` when the store settlement fails.
pub async fn reset_usage<S>(
    store: &S,
    user_id: Uuid,
    now: DateTime<Utc>,
    fallback_tz_offset_minutes: i32,
) -> AdvisorResult<DecisionUsage>
where
    S: DocumentStore + ?Sized,
{
    let plan = store
        .settle_decision(user_id, &|document: &UserDocument| {
            let tz_offset = document
                .usage
                .decisions
                .tz_offset_minutes
                .unwrap_or(fallback_tz_offset_minutes);
            let today = usage_gate::local_day(now, tz_offset);
            UsagePlan::Grant(DecisionUsage::fresh(today, tz_offset))
        })
        .await
        .map_err(|e| {
            AdvisorError::database(format!("usage reset failed: {e}")).with_user_id(user_id)
        })?;

    match plan {
        UsagePlan::Grant(usage) => {
            info!(user_id = %user_id, "decision usage reset");
            Ok(usage)
        }
        UsagePlan::Deny(_) => Err(AdvisorError::internal("usage reset produced no grant")),
    }
}
