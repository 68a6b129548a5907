// ABOUTME: Deterministic training-adjustment heuristic from daily check-in signals
// ABOUTME: Pure rules, first match wins: pull back on poor recovery, push on strong recovery, else maintain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Decision Heuristic
//!
//! The always-available recommendation source. Given the same inputs it
//! returns the same output, touches no clock, and emits only values that
//! satisfy the trusted recommendation schema. Callers that prefer an external
//! source (an LLM, a remote service) still fall back to this when that source
//! fails, so the rules here are the floor of product behavior.

use crate::constants::heuristic::{
    HIGH_FATIGUE, HIGH_SORENESS, LOW_SLEEP_HOURS, PULL_BACK_INTENSITY_PCT, PUSH_INTENSITY_PCT,
    PUSH_MAX_FATIGUE, PUSH_MIN_MOTIVATION, PUSH_MIN_SLEEP_HOURS,
};
use crate::models::{Adjustments, DecisionInputs, DecisionOutput, DietPhase, TrainingDecision};

/// Deterministic computer for daily training decisions
pub struct DecisionComputer;

impl DecisionComputer {
    /// Compute a recommendation from the day's check-in signals
    ///
    /// Rules are evaluated in order and the first match wins:
    ///
    /// 1. **Pull back** when sleep is short, or fatigue or soreness is high.
    ///    Intensity drops by 20%.
    /// 2. **Push** when sleep is solid, fatigue is manageable, and motivation
    ///    is high. Intensity rises by 20%.
    /// 3. **Maintain** otherwise, with no adjustments.
    ///
    /// Users in a cut get an extra note regardless of the verdict: recovery
    /// headroom is lower in a deficit.
    #[must_use]
    pub fn compute(inputs: &DecisionInputs) -> DecisionOutput {
        let output = Self::decide(inputs);
        #[cfg(debug_assertions)]
        Self::assert_schema_clean(&output);
        output
    }

    fn decide(inputs: &DecisionInputs) -> DecisionOutput {
        let low_sleep = inputs.sleep_hours < LOW_SLEEP_HOURS;
        let elevated_strain = inputs.fatigue >= HIGH_FATIGUE || inputs.soreness >= HIGH_SORENESS;

        if low_sleep || elevated_strain {
            let mut explanation = vec!["Recovery signals are low today.".to_owned()];
            if low_sleep {
                explanation.push("Sleep is below 6 hours.".to_owned());
            }
            if elevated_strain {
                explanation.push("Fatigue/soreness is elevated.".to_owned());
            }
            return Self::finish(
                TrainingDecision::PullBack,
                explanation,
                Some(PULL_BACK_INTENSITY_PCT),
                inputs.diet_phase,
            );
        }

        let strong_recovery = inputs.sleep_hours >= PUSH_MIN_SLEEP_HOURS
            && inputs.fatigue <= PUSH_MAX_FATIGUE
            && inputs.motivation >= PUSH_MIN_MOTIVATION;

        if strong_recovery {
            return Self::finish(
                TrainingDecision::Push,
                vec![
                    "Recovery looks solid.".to_owned(),
                    "Motivation is high with manageable fatigue.".to_owned(),
                ],
                Some(PUSH_INTENSITY_PCT),
                inputs.diet_phase,
            );
        }

        Self::finish(
            TrainingDecision::Maintain,
            vec![
                "Keep a steady session today.".to_owned(),
                "No strong signal to push or pull back.".to_owned(),
            ],
            None,
            inputs.diet_phase,
        )
    }

    fn finish(
        decision: TrainingDecision,
        mut explanation: Vec<String>,
        intensity_pct: Option<i32>,
        diet_phase: DietPhase,
    ) -> DecisionOutput {
        if diet_phase == DietPhase::Cut {
            explanation.push("Given you're in a cut, keep increases conservative.".to_owned());
        }
        DecisionOutput {
            decision,
            explanation,
            adjustments: intensity_pct.map(|pct| Adjustments { intensity_pct: pct }),
        }
    }

    /// Debug-build consistency check: the heuristic must pass its own boundary
    #[cfg(debug_assertions)]
    fn assert_schema_clean(output: &DecisionOutput) {
        match serde_json::to_value(output) {
            Ok(value) => debug_assert!(
                super::sanitizer::sanitize(&value).is_ok(),
                "heuristic emitted output its own sanitizer rejects"
            ),
            Err(err) => debug_assert!(false, "heuristic output failed to serialize: {err}"),
        }
    }
}
