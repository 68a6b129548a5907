// ABOUTME: Domain service layer for business logic shared by API handlers and jobs
// ABOUTME: Protocol-agnostic entry points so REST, background jobs, and tests agree on rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! Domain service layer
//!
//! Protocol-agnostic business logic. Whatever surface sits in front of the
//! advisor (REST handler, background job, support tooling), it goes through
//! these entry points so the quota rules apply identically everywhere.

/// Decision request orchestration: gate, charge, generate, fall back
pub mod decision;

pub use decision::{
    gate_and_consume, preview_decision, request_decision, reset_usage, usage_status,
    DecisionOutcome,
};
