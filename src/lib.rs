// ABOUTME: Milo training advisor - quota-gated daily training adjustment decisions
// ABOUTME: Usage gating, deterministic heuristics, and a sanitizing trust boundary over a document store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Milo Training Advisor
//!
//! Decides, once per request, whether an athlete should push harder, hold
//! steady, or pull back today - and whether they are allowed to ask at all.
//!
//! ## Features
//!
//! - **Usage gate**: lifetime trial credits, per-day ceilings by tier, and a
//!   cooldown for subscribers, all evaluated against the user's local day
//! - **Deterministic heuristic**: a pure function from daily check-in signals
//!   to a push/maintain/pull-back recommendation
//! - **Trust boundary**: recommendation sources (including LLMs) return
//!   untrusted JSON; the sanitizer narrows it to the published schema or
//!   rejects it
//! - **Atomic settlement**: gate checks and counter writes happen inside one
//!   store transaction, so racing devices can never double-spend a credit
//!
//! ## Architecture
//!
//! ```text
//! services::decision  - orchestration: gate, consume, recommend
//!   ├── usage_gate    - pure quota logic over normalized counters
//!   ├── intelligence  - heuristic, sanitizer, provider seam
//!   └── store         - DocumentStore trait, SQLite + in-memory backends
//! milo-core           - models, errors, constants (no I/O)
//! ```
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use milo_advisor::intelligence::HeuristicProvider;
//! use milo_advisor::models::{DecisionInputs, DietPhase, TrainingPhase};
//! use milo_advisor::services::decision::{self, DecisionOutcome};
//! use milo_advisor::store::MemoryStore;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let inputs = DecisionInputs {
//!     sleep_hours: 7.5,
//!     soreness: 2.0,
//!     fatigue: 3.0,
//!     motivation: 8.0,
//!     training_phase: TrainingPhase::Hypertrophy,
//!     diet_phase: DietPhase::Maintain,
//! };
//!
//! let outcome = decision::request_decision(
//!     &store,
//!     &HeuristicProvider,
//!     Uuid::new_v4(),
//!     &inputs,
//!     Utc::now(),
//!     0, // fall back to UTC when the user has no stored timezone
//! )
//! .await?;
//!
//! match outcome {
//!     DecisionOutcome::Granted { recommendation, usage } => {
//!         assert_eq!(usage.daily_count, 1);
//!         println!("{}", recommendation.decision);
//!     }
//!     DecisionOutcome::Denied(denial) => println!("{}", denial.user_message()),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

/// Environment-driven configuration
pub mod config;

/// Recommendation intelligence: heuristic, sanitizer, and provider seam
pub mod intelligence;

/// Structured logging setup built on tracing
pub mod logging;

/// Domain services orchestrating gate, store, and intelligence
pub mod services;

/// Document store trait and its SQLite and in-memory backends
pub mod store;

/// Pure quota logic: day normalization, gate evaluation, consumption
pub mod usage_gate;

pub use milo_core::constants;
pub use milo_core::errors;
pub use milo_core::models;
