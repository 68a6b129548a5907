// ABOUTME: Criterion benchmarks for the decision pipeline hot paths
// ABOUTME: Measures heuristic computation, sanitization, gate evaluation, and settlement
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! Criterion benchmarks for the decision pipeline.
//!
//! Measures the deterministic heuristic, recommendation sanitization, gate
//! evaluation, and a full in-memory settlement round trip.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use milo_advisor::intelligence::{sanitize, sanitize_text, DecisionComputer};
use milo_advisor::models::{
    DecisionInputs, DietPhase, Entitlement, StoredDecisionUsage, TrainingPhase,
};
use milo_advisor::services::decision::gate_and_consume;
use milo_advisor::store::MemoryStore;
use milo_advisor::usage_gate::{evaluate_gate, normalize_usage};
use serde_json::json;
use tokio::runtime::Runtime;
use uuid::Uuid;

fn create_inputs(sleep_hours: f64, fatigue: f64, soreness: f64, motivation: f64) -> DecisionInputs {
    DecisionInputs {
        sleep_hours,
        soreness,
        fatigue,
        motivation,
        training_phase: TrainingPhase::Hypertrophy,
        diet_phase: DietPhase::Maintain,
    }
}

fn bench_instant() -> DateTime<Utc> {
    "2025-01-15T12:00:00Z".parse().unwrap()
}

fn bench_heuristic_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("heuristic_compute");

    let cases = [
        ("pull_back", create_inputs(5.0, 8.0, 7.0, 6.0)),
        ("push", create_inputs(8.0, 2.0, 1.0, 9.0)),
        ("maintain", create_inputs(6.5, 5.0, 5.0, 5.0)),
    ];

    for (name, inputs) in &cases {
        group.bench_with_input(BenchmarkId::from_parameter(*name), inputs, |b, inputs| {
            b.iter(|| DecisionComputer::compute(black_box(inputs)));
        });
    }

    group.finish();
}

fn bench_sanitization(c: &mut Criterion) {
    let payload = json!({
        "decision": "PULL_BACK",
        "explanation": [
            "Recovery signals are low today.",
            "Sleep is below 6 hours.",
            "Fatigue/soreness is elevated.",
            "Given you're in a cut, keep increases conservative."
        ],
        "adjustments": { "intensityPct": -20 }
    });

    c.bench_function("sanitize_value", |b| {
        b.iter(|| sanitize(black_box(&payload)).unwrap());
    });

    let wrapped = format!("Here you go:\n```json\n{payload}\n```\nGood luck!");
    c.bench_function("sanitize_fenced_text", |b| {
        b.iter(|| sanitize_text(black_box(&wrapped)).unwrap());
    });
}

fn bench_gate_evaluation(c: &mut Criterion) {
    let now = bench_instant();
    let subscriber = Entitlement {
        is_subscribed: true,
    };
    let stored = StoredDecisionUsage {
        free_remaining: Some(3),
        daily_count: Some(1),
        daily_date: Some("2025-01-14".parse().unwrap()),
        tz_offset_minutes: Some(300),
        last_decision_at: Some("2025-01-14T22:00:00Z".parse().unwrap()),
    };

    c.bench_function("normalize_and_evaluate", |b| {
        b.iter(|| {
            let usage = normalize_usage(black_box(&stored), now, 300);
            evaluate_gate(subscriber, &usage, now)
        });
    });
}

fn bench_memory_settlement(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let now = bench_instant();

    c.bench_function("memory_settlement_grant", |b| {
        b.iter_batched(
            || (MemoryStore::new(), Uuid::new_v4()),
            |(store, user_id)| {
                runtime
                    .block_on(gate_and_consume(black_box(&store), user_id, now, 0))
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_heuristic_compute,
    bench_sanitization,
    bench_gate_evaluation,
    bench_memory_settlement
);
criterion_main!(benches);
