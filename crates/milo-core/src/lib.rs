// ABOUTME: Foundation crate for the Milo training advisor
// ABOUTME: Shared error types, domain models, and tuning constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Milo Core
//!
//! Foundation types for the Milo training advisor. This crate carries no I/O:
//! everything here is plain data plus the validation rules that keep it
//! trustworthy. Higher layers (storage, gating services, recommendation
//! providers) live in the `milo_advisor` crate and build on these types.
//!
//! ## Contents
//!
//! - **Errors**: [`errors::AdvisorError`] with stable machine-readable codes,
//!   and [`errors::SanitizeError`] for the recommendation trust boundary
//! - **Models**: daily check-in inputs, trusted recommendation output, and
//!   per-user usage counters
//! - **Constants**: quota limits, heuristic thresholds, and explanation caps

#![deny(unsafe_code)]

/// Error types with stable error codes shared across the advisor
pub mod errors;

/// Domain models: decision inputs/outputs and usage counters
pub mod models;

/// Tuning constants: quota limits, heuristic thresholds, explanation caps
pub mod constants;
