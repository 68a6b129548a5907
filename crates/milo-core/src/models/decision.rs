// ABOUTME: Decision pipeline models: daily check-in signals and the trusted recommendation shape
// ABOUTME: Defines DecisionInputs, TrainingDecision, Adjustments, and DecisionOutput with its schema rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

use crate::constants::{explanation, limits};
use crate::errors::{AdvisorError, AdvisorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Training block the athlete is currently working through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    /// Muscle-building block: higher volume, moderate loads
    Hypertrophy,
    /// Strength block: heavier loads, lower volume
    Strength,
    /// Power block: explosive work at submaximal loads
    Power,
}

impl TrainingPhase {
    /// Stable string form, identical to the serde representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hypertrophy => "hypertrophy",
            Self::Strength => "strength",
            Self::Power => "power",
        }
    }
}

impl FromStr for TrainingPhase {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hypertrophy" => Ok(Self::Hypertrophy),
            "strength" => Ok(Self::Strength),
            "power" => Ok(Self::Power),
            other => Err(AdvisorError::invalid_input(format!(
                "unknown training phase: {other}"
            ))),
        }
    }
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Nutrition phase the athlete is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DietPhase {
    /// Caloric deficit; recovery capacity is reduced
    Cut,
    /// Maintenance calories
    Maintain,
    /// Caloric surplus
    Bulk,
}

impl DietPhase {
    /// Stable string form, identical to the serde representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Maintain => "maintain",
            Self::Bulk => "bulk",
        }
    }
}

impl FromStr for DietPhase {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cut" => Ok(Self::Cut),
            "maintain" => Ok(Self::Maintain),
            "bulk" => Ok(Self::Bulk),
            other => Err(AdvisorError::invalid_input(format!(
                "unknown diet phase: {other}"
            ))),
        }
    }
}

impl fmt::Display for DietPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Daily recovery and readiness signals from the athlete's check-in
///
/// Numeric signals are accepted over the full finite range: the heuristic is
/// total for any finite value, so out-of-range entries (a soreness of 14, a
/// negative sleep figure) flow through unclamped rather than being rejected.
/// Only non-finite values fail [`validate`](Self::validate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInputs {
    /// Hours slept last night
    pub sleep_hours: f64,
    /// Muscle soreness, nominally 0-10
    pub soreness: f64,
    /// Overall fatigue, nominally 0-10
    pub fatigue: f64,
    /// Motivation to train, nominally 0-10
    pub motivation: f64,
    /// Current training block
    pub training_phase: TrainingPhase,
    /// Current nutrition phase
    pub diet_phase: DietPhase,
}

impl DecisionInputs {
    /// Reject non-finite numeric signals before they reach the heuristic
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::InvalidInput`](crate::errors::ErrorCode::InvalidInput)
    /// naming the first offending field when any signal is NaN or infinite.
    pub fn validate(&self) -> AdvisorResult<()> {
        for (name, value) in [
            ("sleepHours", self.sleep_hours),
            ("soreness", self.soreness),
            ("fatigue", self.fatigue),
            ("motivation", self.motivation),
        ] {
            if !value.is_finite() {
                return Err(AdvisorError::invalid_input(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// The three-way training adjustment verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingDecision {
    /// Recovery looks good: train harder than planned today
    Push,
    /// No strong signal either way: run the planned session
    Maintain,
    /// Recovery is compromised: back the session off
    PullBack,
}

impl TrainingDecision {
    /// Stable string form, identical to the serde representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "PUSH",
            Self::Maintain => "MAINTAIN",
            Self::PullBack => "PULL_BACK",
        }
    }
}

impl FromStr for TrainingDecision {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUSH" => Ok(Self::Push),
            "MAINTAIN" => Ok(Self::Maintain),
            "PULL_BACK" => Ok(Self::PullBack),
            other => Err(AdvisorError::invalid_input(format!(
                "unknown training decision: {other}"
            ))),
        }
    }
}

impl fmt::Display for TrainingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session adjustments attached to a non-MAINTAIN decision
///
/// The schema is closed: volume adjustments from recommendation sources are
/// deliberately not representable here, so they can never reach a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adjustments {
    /// Intensity change in percent; always one of -20, -10, 10, 20
    #[serde(rename = "intensityPct")]
    pub intensity_pct: i32,
}

/// Caps applied to a recommendation's explanation bullets
///
/// Production always uses [`Default`], which mirrors the published schema.
/// The fields exist so the normalization pipeline can be exercised under
/// tighter caps in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplanationLimits {
    /// Fewest bullets an explanation may carry
    pub min_bullets: usize,
    /// Most bullets an explanation may carry
    pub max_bullets: usize,
    /// Per-bullet character cap
    pub max_bullet_chars: usize,
    /// Combined character cap across all bullets
    pub max_total_chars: usize,
}

impl Default for ExplanationLimits {
    fn default() -> Self {
        Self {
            min_bullets: explanation::MIN_BULLETS,
            max_bullets: explanation::MAX_BULLETS,
            max_bullet_chars: explanation::MAX_BULLET_CHARS,
            max_total_chars: explanation::MAX_TOTAL_CHARS,
        }
    }
}

/// A trusted training recommendation
///
/// Values of this type only exist on the trusted side of the boundary: they
/// come from the deterministic heuristic or from a candidate that survived
/// the sanitizer. Deserialization is strict (`deny_unknown_fields`), so JSON
/// carrying extra keys such as `volumePct` cannot parse into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionOutput {
    /// The adjustment verdict
    pub decision: TrainingDecision,
    /// 2-4 short bullets explaining the verdict
    pub explanation: Vec<String>,
    /// Present only for PUSH and PULL_BACK decisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<Adjustments>,
}

impl DecisionOutput {
    /// Check this output against the published schema caps
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::InvalidFormat`](crate::errors::ErrorCode::InvalidFormat)
    /// describing the first violated rule.
    pub fn validate(&self) -> AdvisorResult<()> {
        self.validate_with(&ExplanationLimits::default())
    }

    /// Check this output against explicit explanation caps
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate), evaluated under `limits`.
    pub fn validate_with(&self, limits: &ExplanationLimits) -> AdvisorResult<()> {
        let count = self.explanation.len();
        if !(limits.min_bullets..=limits.max_bullets).contains(&count) {
            return Err(AdvisorError::invalid_format(format!(
                "explanation carries {count} bullets; allowed range is {}-{}",
                limits.min_bullets, limits.max_bullets
            )));
        }

        let mut total_chars = 0usize;
        for (index, bullet) in self.explanation.iter().enumerate() {
            let chars = bullet.chars().count();
            if chars > limits.max_bullet_chars {
                return Err(AdvisorError::invalid_format(format!(
                    "explanation bullet {index} is {chars} characters; cap is {}",
                    limits.max_bullet_chars
                )));
            }
            total_chars += chars;
        }
        if total_chars > limits.max_total_chars {
            return Err(AdvisorError::invalid_format(format!(
                "explanation totals {total_chars} characters; cap is {}",
                limits.max_total_chars
            )));
        }

        match (&self.decision, &self.adjustments) {
            (TrainingDecision::Maintain, Some(_)) => Err(AdvisorError::invalid_format(
                "MAINTAIN must not carry adjustments",
            )),
            (_, Some(adjustments))
                if !limits::ALLOWED_INTENSITY_STEPS.contains(&adjustments.intensity_pct) =>
            {
                Err(AdvisorError::invalid_format(format!(
                    "intensityPct {} is not an allowed step",
                    adjustments.intensity_pct
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn maintain_output() -> DecisionOutput {
        DecisionOutput {
            decision: TrainingDecision::Maintain,
            explanation: vec![
                "Keep a steady session today.".to_owned(),
                "No strong signal to push or pull back.".to_owned(),
            ],
            adjustments: None,
        }
    }

    #[test]
    fn decision_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TrainingDecision::PullBack).unwrap(),
            "\"PULL_BACK\""
        );
        assert_eq!(
            serde_json::from_str::<TrainingDecision>("\"PUSH\"").unwrap(),
            TrainingDecision::Push
        );
    }

    #[test]
    fn inputs_use_camel_case_keys() {
        let inputs = DecisionInputs {
            sleep_hours: 7.5,
            soreness: 2.0,
            fatigue: 3.0,
            motivation: 8.0,
            training_phase: TrainingPhase::Strength,
            diet_phase: DietPhase::Maintain,
        };
        let value = serde_json::to_value(inputs).unwrap();
        assert_eq!(value["sleepHours"], 7.5);
        assert_eq!(value["trainingPhase"], "strength");
        assert_eq!(value["dietPhase"], "maintain");
    }

    #[test]
    fn validate_rejects_non_finite_signals() {
        let mut inputs = DecisionInputs {
            sleep_hours: f64::NAN,
            soreness: 2.0,
            fatigue: 3.0,
            motivation: 8.0,
            training_phase: TrainingPhase::Hypertrophy,
            diet_phase: DietPhase::Bulk,
        };
        let err = inputs.validate().unwrap_err();
        assert!(err.message.contains("sleepHours"));

        inputs.sleep_hours = 7.0;
        inputs.motivation = f64::INFINITY;
        let err = inputs.validate().unwrap_err();
        assert!(err.message.contains("motivation"));

        inputs.motivation = 8.0;
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn validate_accepts_out_of_range_but_finite_signals() {
        let inputs = DecisionInputs {
            sleep_hours: -2.0,
            soreness: 14.0,
            fatigue: 3.0,
            motivation: 11.0,
            training_phase: TrainingPhase::Power,
            diet_phase: DietPhase::Cut,
        };
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn trusted_shape_rejects_volume_pct() {
        let json = r#"{
            "decision": "PUSH",
            "explanation": ["Recovery looks solid.", "Motivation is high with manageable fatigue."],
            "adjustments": { "intensityPct": 20, "volumePct": 10 }
        }"#;
        assert!(serde_json::from_str::<DecisionOutput>(json).is_err());
    }

    #[test]
    fn validate_rejects_maintain_with_adjustments() {
        let mut output = maintain_output();
        output.adjustments = Some(Adjustments { intensity_pct: 10 });
        let err = output.validate().unwrap_err();
        assert!(err.message.contains("MAINTAIN"));
    }

    #[test]
    fn validate_rejects_off_menu_intensity() {
        let output = DecisionOutput {
            decision: TrainingDecision::Push,
            adjustments: Some(Adjustments { intensity_pct: 15 }),
            ..maintain_output()
        };
        let err = output.validate().unwrap_err();
        assert!(err.message.contains("15"));
    }

    #[test]
    fn validate_enforces_bullet_count_range() {
        let mut output = maintain_output();
        output.explanation.truncate(1);
        assert!(output.validate().is_err());

        output.explanation = vec!["a".to_owned(); 5];
        assert!(output.validate().is_err());
    }

    #[test]
    fn validate_with_honors_custom_caps() {
        let output = maintain_output();
        let tight = ExplanationLimits {
            min_bullets: 2,
            max_bullets: 4,
            max_bullet_chars: 10,
            max_total_chars: 20,
        };
        assert!(output.validate_with(&tight).is_err());
        assert!(output.validate().is_ok());
    }
}
