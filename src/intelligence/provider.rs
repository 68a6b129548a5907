// ABOUTME: Pluggable recommendation sources behind a trait, plus the sanitize-or-fall-back flow
// ABOUTME: External providers return untrusted JSON; the heuristic is the always-correct floor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Decision Providers
//!
//! A [`DecisionProvider`] is anything that can propose a recommendation for
//! a day's signals: the built-in heuristic, an LLM behind an API, a remote
//! coaching service. Provider output is untrusted by contract; only
//! [`resolve_decision`] may turn it into a [`DecisionOutput`], and it does so
//! by sanitizing the candidate and falling back to the deterministic
//! heuristic whenever the provider fails or returns something the sanitizer
//! rejects. Callers therefore always get a valid recommendation for valid
//! inputs.

use super::heuristic::DecisionComputer;
use super::sanitizer;
use crate::errors::AdvisorResult;
use crate::models::{DecisionInputs, DecisionOutput};
use async_trait::async_trait;
use serde_json::Value;

/// A source of candidate training recommendations
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Short identifier for logs, e.g. `heuristic` or `model:gpt-4o-mini`
    fn name(&self) -> &str;

    /// Propose a recommendation for the given signals
    ///
    /// The returned JSON is untrusted: it has not been validated against the
    /// recommendation schema and must pass the sanitizer before use.
    ///
    /// # Errors
    ///
    /// Implementations surface transport or serialization failures here;
    /// callers treat any error as "no candidate" and fall back.
    async fn recommend(&self, inputs: &DecisionInputs) -> AdvisorResult<Value>;
}

/// The deterministic heuristic exposed through the provider seam
///
/// Useful as the default provider and as the explicit fallback target.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicProvider;

#[async_trait]
impl DecisionProvider for HeuristicProvider {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn recommend(&self, inputs: &DecisionInputs) -> AdvisorResult<Value> {
        Ok(serde_json::to_value(DecisionComputer::compute(inputs))?)
    }
}

/// Run a provider through the trust boundary, falling back to the heuristic
///
/// The only failure mode left after this function is invalid *inputs*; any
/// provider misbehavior (transport errors, malformed JSON, schema
/// violations) is logged and silently replaced by the heuristic's answer.
///
/// # Errors
///
/// Returns [`ErrorCode::InvalidInput`](crate::errors::ErrorCode::InvalidInput)
/// when the signals themselves are malformed.
pub async fn resolve_decision(
    provider: &dyn DecisionProvider,
    inputs: &DecisionInputs,
) -> AdvisorResult<DecisionOutput> {
    inputs.validate()?;

    let candidate = match provider.recommend(inputs).await {
        Ok(candidate) => candidate,
        Err(err) => {
            tracing::warn!(
                provider = provider.name(),
                error = %err,
                "provider failed; falling back to heuristic"
            );
            return Ok(DecisionComputer::compute(inputs));
        }
    };

    match sanitizer::sanitize(&candidate) {
        Ok(output) => Ok(output),
        Err(err) => {
            tracing::warn!(
                provider = provider.name(),
                code = err.code(),
                error = %err,
                "candidate rejected by sanitizer; falling back to heuristic"
            );
            Ok(DecisionComputer::compute(inputs))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::errors::AdvisorError;
    use crate::models::{DietPhase, TrainingDecision, TrainingPhase};

    struct CannedProvider(Value);

    #[async_trait]
    impl DecisionProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn recommend(&self, _inputs: &DecisionInputs) -> AdvisorResult<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl DecisionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn recommend(&self, _inputs: &DecisionInputs) -> AdvisorResult<Value> {
            Err(AdvisorError::internal("upstream timed out"))
        }
    }

    fn push_day_inputs() -> DecisionInputs {
        DecisionInputs {
            sleep_hours: 8.0,
            soreness: 1.0,
            fatigue: 2.0,
            motivation: 9.0,
            training_phase: TrainingPhase::Strength,
            diet_phase: DietPhase::Maintain,
        }
    }

    #[tokio::test]
    async fn valid_candidate_passes_through() {
        let provider = CannedProvider(serde_json::json!({
            "decision": "PULL_BACK",
            "explanation": ["Recovery signals are low today.", "Fatigue/soreness is elevated."],
            "adjustments": { "intensityPct": -10 },
        }));
        let output = resolve_decision(&provider, &push_day_inputs()).await.unwrap();
        assert_eq!(output.decision, TrainingDecision::PullBack);
        assert_eq!(output.adjustments.unwrap().intensity_pct, -10);
    }

    #[tokio::test]
    async fn rejected_candidate_falls_back_to_heuristic() {
        let provider = CannedProvider(serde_json::json!({
            "decision": "TRAIN_HARDER",
            "explanation": ["go"],
        }));
        let inputs = push_day_inputs();
        let output = resolve_decision(&provider, &inputs).await.unwrap();
        assert_eq!(output, DecisionComputer::compute(&inputs));
    }

    #[tokio::test]
    async fn provider_error_falls_back_to_heuristic() {
        let inputs = push_day_inputs();
        let output = resolve_decision(&FailingProvider, &inputs).await.unwrap();
        assert_eq!(output, DecisionComputer::compute(&inputs));
        assert_eq!(output.decision, TrainingDecision::Push);
    }

    #[tokio::test]
    async fn invalid_inputs_are_not_masked_by_fallback() {
        let mut inputs = push_day_inputs();
        inputs.fatigue = f64::NAN;
        let err = resolve_decision(&HeuristicProvider, &inputs).await.unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn heuristic_provider_output_sanitizes_cleanly() {
        let output = resolve_decision(&HeuristicProvider, &push_day_inputs())
            .await
            .unwrap();
        assert_eq!(output.decision, TrainingDecision::Push);
        assert!(output.validate().is_ok());
    }
}
