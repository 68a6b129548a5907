// ABOUTME: Domain models for the Milo training advisor
// ABOUTME: Re-exports decision inputs/outputs and per-user usage counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Data Models
//!
//! Plain data types shared across the advisor. Split by concern:
//!
//! - [`decision`]: the daily check-in signals and the trusted recommendation
//!   shape that leaves the trust boundary
//! - [`usage`]: per-user quota counters, the persisted document layout, and
//!   the gate outcome types

mod decision;
mod usage;

pub use decision::{
    Adjustments, DecisionInputs, DecisionOutput, DietPhase, ExplanationLimits, TrainingDecision,
    TrainingPhase,
};
pub use usage::{
    DecisionUsage, Entitlement, GateDenial, GateOutcome, GateVerdict, StoredDecisionUsage,
    UsageSection, UsageStatus, UserDocument,
};
