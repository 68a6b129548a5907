// ABOUTME: Trust boundary narrowing untrusted recommendation JSON into the published schema
// ABOUTME: Lenient on explanation noise, strict on shape; volume adjustments can never pass through
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Output Sanitizer
//!
//! Recommendation sources are untrusted, LLM-backed ones doubly so. Whatever
//! they return enters here as raw JSON (or raw text) and leaves either as a
//! [`DecisionOutput`] that provably satisfies the published schema, or as a
//! typed [`SanitizeError`] the caller can log and fall back on.
//!
//! The pipeline is lenient about explanation noise (whitespace, empty
//! bullets, over-long text get cleaned up) and strict about shape: unknown
//! fields, mistyped values, and off-menu adjustment magnitudes are rejected
//! or dropped, never passed along. A `volumePct` field is accepted on input
//! for compatibility with older model prompts and then discarded; the trusted
//! schema has no way to express it.

use crate::constants::limits;
use crate::errors::SanitizeError;
use crate::models::{Adjustments, DecisionOutput, ExplanationLimits, TrainingDecision};
use serde::Deserialize;
use serde_json::Value;

/// Candidate recommendation as a source is allowed to shape it
///
/// Unknown fields fail deserialization: a source inventing keys is a source
/// we do not trust about anything else either.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawRecommendation {
    decision: TrainingDecision,
    explanation: Vec<String>,
    #[serde(default)]
    adjustments: Option<RawAdjustments>,
}

/// Adjustments block as a source may send it; both fields numeric or null
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawAdjustments {
    #[serde(default)]
    intensity_pct: Option<f64>,
    /// Accepted on input, never carried into trusted output
    #[serde(default)]
    volume_pct: Option<f64>,
}

/// Sanitize a candidate recommendation under the production caps
///
/// # Errors
///
/// - [`SanitizeError::InvalidOutput`] when the candidate's shape or the
///   assembled result violates the schema
/// - [`SanitizeError::InvalidExplanationCount`] when fewer than two or more
///   than four bullets remain after cleanup
pub fn sanitize(raw: &Value) -> Result<DecisionOutput, SanitizeError> {
    sanitize_with(raw, &ExplanationLimits::default())
}

/// Sanitize a candidate recommendation under explicit explanation caps
///
/// Production always uses [`sanitize`]; this entry point exists so the
/// normalization pipeline can be exercised under tighter caps.
///
/// # Errors
///
/// Same as [`sanitize`], evaluated under `limits`.
pub fn sanitize_with(
    raw: &Value,
    limits: &ExplanationLimits,
) -> Result<DecisionOutput, SanitizeError> {
    let candidate = RawRecommendation::deserialize(raw).map_err(|err| {
        tracing::debug!(error = %err, "recommendation candidate failed shape check");
        SanitizeError::InvalidOutput {
            reason: err.to_string(),
        }
    })?;

    let explanation = normalize_explanation(&candidate.explanation, limits);
    let count = explanation.len();
    if !(limits.min_bullets..=limits.max_bullets).contains(&count) {
        tracing::debug!(count, "explanation bullet count out of range after cleanup");
        return Err(SanitizeError::InvalidExplanationCount {
            count,
            min: limits.min_bullets,
            max: limits.max_bullets,
        });
    }

    let adjustments = derive_adjustments(candidate.decision, candidate.adjustments.as_ref());

    let output = DecisionOutput {
        decision: candidate.decision,
        explanation,
        adjustments,
    };
    output
        .validate_with(limits)
        .map_err(|err| SanitizeError::InvalidOutput {
            reason: err.message,
        })?;
    Ok(output)
}

/// Sanitize a candidate arriving as raw text (an LLM completion, a webhook body)
///
/// Tries the whole text as JSON first, then a fenced ```` ```json ````
/// block, then the outermost brace span, before giving up.
///
/// # Errors
///
/// [`SanitizeError::InvalidJson`] when no strategy yields JSON, otherwise
/// the same errors as [`sanitize`].
pub fn sanitize_text(raw: &str) -> Result<DecisionOutput, SanitizeError> {
    let value = extract_candidate_json(raw)?;
    sanitize(&value)
}

fn extract_candidate_json(text: &str) -> Result<Value, SanitizeError> {
    let primary = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let Some(block) = fenced_json_block(text) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Ok(value);
        }
    }

    if let Some(span) = brace_span(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    tracing::debug!("no JSON found in recommendation text");
    Err(SanitizeError::InvalidJson { source: primary })
}

fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Clean up explanation bullets: trim, drop empties, cap count and length
fn normalize_explanation(raw: &[String], limits: &ExplanationLimits) -> Vec<String> {
    let mut bullets: Vec<String> = raw
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .take(limits.max_bullets)
        .map(|entry| truncate_with_ellipsis(entry, limits.max_bullet_chars))
        .collect();

    shrink_to_total(&mut bullets, limits.max_total_chars);
    bullets
}

/// Shrink bullets from the end until the combined length fits the cap
///
/// Only reachable when `max_total_chars` is smaller than
/// `max_bullets * max_bullet_chars`; the production caps already fit.
fn shrink_to_total(bullets: &mut [String], max_total_chars: usize) {
    let mut total: usize = bullets.iter().map(|b| b.chars().count()).sum();
    for index in (0..bullets.len()).rev() {
        if total <= max_total_chars {
            return;
        }
        let length = bullets[index].chars().count();
        let target = length.saturating_sub(total - max_total_chars);
        bullets[index] = truncate_with_ellipsis(&bullets[index], target);
        total = total - length + bullets[index].chars().count();
    }
}

/// Cap `text` at `max_chars` Unicode scalar values
///
/// When truncation happens the final three characters become `...`, unless
/// the cap itself is three or fewer, in which case the text is hard-cut.
fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut truncated: String = text.chars().take(max_chars - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Keep adjustments only when the decision warrants them and the magnitude is on the menu
///
/// MAINTAIN never carries adjustments. For PUSH and PULL_BACK the raw
/// intensity must exactly equal one of the allowed steps; anything else is
/// silently dropped rather than rounded. Volume never transfers.
fn derive_adjustments(
    decision: TrainingDecision,
    raw: Option<&RawAdjustments>,
) -> Option<Adjustments> {
    if decision == TrainingDecision::Maintain {
        return None;
    }
    let raw_intensity = raw?.intensity_pct?;
    limits::ALLOWED_INTENSITY_STEPS
        .iter()
        .copied()
        .find(|step| (f64::from(*step) - raw_intensity).abs() < f64::EPSILON)
        .map(|intensity_pct| Adjustments { intensity_pct })
}
