// ABOUTME: Recommendation intelligence: deterministic heuristic, output sanitizer, provider seam
// ABOUTME: Everything that produces or vets a training recommendation lives under this module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Intelligence
//!
//! Three pieces cooperate to turn daily check-in signals into a trusted
//! recommendation:
//!
//! - [`heuristic`]: the deterministic rules engine; always available and
//!   always schema-correct
//! - [`sanitizer`]: the trust boundary that narrows untrusted candidate JSON
//!   (from an LLM or any other source) into [`DecisionOutput`] or rejects it
//! - [`provider`]: the pluggable source seam plus the resolution flow that
//!   falls back to the heuristic when a provider misbehaves
//!
//! [`DecisionOutput`]: crate::models::DecisionOutput

/// Deterministic training-adjustment heuristic
pub mod heuristic;

/// Pluggable recommendation sources and heuristic fallback
pub mod provider;

/// Trust boundary for untrusted recommendation candidates
pub mod sanitizer;

pub use heuristic::DecisionComputer;
pub use provider::{resolve_decision, DecisionProvider, HeuristicProvider};
pub use sanitizer::{sanitize, sanitize_text};
