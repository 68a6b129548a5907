// ABOUTME: Integration tests for the SQLite document store
// ABOUTME: Verifies merge-writes preserve foreign fields and settlements serialize under race
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! SQLite Store Tests
//!
//! File-backed databases via tempfile, raw-SQL seeded documents to prove
//! sibling preservation, and a concurrent settlement race for the
//! one-grant-per-day guarantee.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use milo_advisor::models::{DecisionUsage, Entitlement, GateDenial, GateOutcome};
use milo_advisor::services::decision::gate_and_consume;
use milo_advisor::store::{DocumentStore, SqliteStore, UsagePlan};
use serde_json::{json, Value};
use sqlx::Row;
use tempfile::TempDir;
use uuid::Uuid;

fn instant(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

async fn create_file_store(temp_dir: &TempDir, name: &str) -> SqliteStore {
    let db_path = temp_dir.path().join(name);
    let db_url = format!("sqlite:{}", db_path.display());
    SqliteStore::new(&db_url).await.unwrap()
}

async fn read_raw_document(store: &SqliteStore, user_id: Uuid) -> Value {
    let row = sqlx::query("SELECT document FROM user_documents WHERE user_id = $1")
        .bind(user_id.to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
    let raw: String = row.try_get("document").unwrap();
    serde_json::from_str(&raw).unwrap()
}

async fn seed_raw_document(store: &SqliteStore, user_id: Uuid, document: &Value) {
    sqlx::query("INSERT INTO user_documents (user_id, document, updated_at) VALUES ($1, $2, $3)")
        .bind(user_id.to_string())
        .bind(document.to_string())
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .unwrap();
}

// ============================================================================
// Basic round trips
// ============================================================================

#[tokio::test]
async fn test_unknown_user_reads_as_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "none.db").await;

    assert!(store
        .get_user_document(Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_entitlement_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "entitlement.db").await;
    let user_id = Uuid::new_v4();

    store
        .set_entitlement(user_id, Entitlement { is_subscribed: true })
        .await
        .unwrap();

    let document = store.get_user_document(user_id).await.unwrap().unwrap();
    assert!(document.entitlement.is_subscribed);
}

#[tokio::test]
async fn test_granted_settlement_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "grant.db").await;
    let user_id = Uuid::new_v4();

    let mut usage = DecisionUsage::fresh("2025-01-15".parse().unwrap(), 300);
    usage.daily_count = 1;
    usage.free_remaining = 2;
    usage.last_decision_at = Some(instant("2025-01-15T14:00:00Z"));

    let plan = store
        .settle_decision(user_id, &move |_| UsagePlan::Grant(usage.clone()))
        .await
        .unwrap();
    assert!(plan.is_grant());

    let document = store.get_user_document(user_id).await.unwrap().unwrap();
    let stored = document.usage.decisions;
    assert_eq!(stored.free_remaining, Some(2));
    assert_eq!(stored.daily_count, Some(1));
    assert_eq!(stored.tz_offset_minutes, Some(300));
    assert_eq!(
        stored.last_decision_at,
        Some(instant("2025-01-15T14:00:00Z"))
    );
}

#[tokio::test]
async fn test_denied_settlement_never_creates_a_row() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "deny.db").await;
    let user_id = Uuid::new_v4();

    store
        .settle_decision(user_id, &|_| UsagePlan::Deny(GateDenial::FreeExhausted))
        .await
        .unwrap();

    assert!(store.get_user_document(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("reopen.db");
    let db_url = format!("sqlite:{}", db_path.display());
    let user_id = Uuid::new_v4();

    {
        let store = SqliteStore::new(&db_url).await.unwrap();
        store
            .set_entitlement(user_id, Entitlement { is_subscribed: true })
            .await
            .unwrap();
    }

    let store = SqliteStore::new(&db_url).await.unwrap();
    let document = store.get_user_document(user_id).await.unwrap().unwrap();
    assert!(document.entitlement.is_subscribed);
}

#[tokio::test]
async fn test_corrupt_document_surfaces_as_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "corrupt.db").await;
    let user_id = Uuid::new_v4();

    sqlx::query("INSERT INTO user_documents (user_id, document, updated_at) VALUES ($1, $2, $3)")
        .bind(user_id.to_string())
        .bind("definitely not json")
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .unwrap();

    assert!(store.get_user_document(user_id).await.is_err());
}

// ============================================================================
// Merge-write semantics
// ============================================================================

#[tokio::test]
async fn test_settlement_preserves_foreign_document_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "siblings.db").await;
    let user_id = Uuid::new_v4();

    // A document as other backend components might have written it: profile
    // data and an unrelated usage counter the advisor knows nothing about.
    let seeded = json!({
        "profile": { "displayName": "Jordan", "heightCm": 178 },
        "entitlement": { "isSubscribed": false },
        "usage": {
            "decisions": {
                "freeRemaining": 1,
                "dailyCount": 0,
                "dailyDate": "2025-01-14",
                "tzOffsetMinutes": 0
            },
            "mealScans": { "dailyCount": 4 }
        }
    });
    seed_raw_document(&store, user_id, &seeded).await;

    let now = instant("2025-01-15T10:00:00Z");
    let outcome = gate_and_consume(&store, user_id, now, 0).await.unwrap();
    assert!(matches!(outcome, GateOutcome::Granted { .. }));

    let document = read_raw_document(&store, user_id).await;
    // The advisor's subtree changed...
    assert_eq!(document["usage"]["decisions"]["dailyCount"], 1);
    assert_eq!(document["usage"]["decisions"]["freeRemaining"], 0);
    assert_eq!(document["usage"]["decisions"]["dailyDate"], "2025-01-15");
    // ...and everything else is untouched.
    assert_eq!(document["profile"]["displayName"], "Jordan");
    assert_eq!(document["profile"]["heightCm"], 178);
    assert_eq!(document["usage"]["mealScans"]["dailyCount"], 4);
    assert_eq!(document["entitlement"]["isSubscribed"], false);
}

#[tokio::test]
async fn test_entitlement_write_preserves_usage_and_profile() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "entitlement_merge.db").await;
    let user_id = Uuid::new_v4();

    let seeded = json!({
        "profile": { "displayName": "Jordan" },
        "usage": { "decisions": { "freeRemaining": 2, "dailyCount": 1 } }
    });
    seed_raw_document(&store, user_id, &seeded).await;

    store
        .set_entitlement(user_id, Entitlement { is_subscribed: true })
        .await
        .unwrap();

    let document = read_raw_document(&store, user_id).await;
    assert_eq!(document["entitlement"]["isSubscribed"], true);
    assert_eq!(document["profile"]["displayName"], "Jordan");
    assert_eq!(document["usage"]["decisions"]["freeRemaining"], 2);
    assert_eq!(document["usage"]["decisions"]["dailyCount"], 1);
}

#[tokio::test]
async fn test_malformed_counters_normalize_instead_of_failing() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "lenient.db").await;
    let user_id = Uuid::new_v4();

    // Counters written by a buggy or older client: wrong types everywhere.
    let seeded = json!({
        "usage": {
            "decisions": {
                "freeRemaining": "plenty",
                "dailyCount": 1.5,
                "dailyDate": 20250114,
                "tzOffsetMinutes": "EST"
            }
        }
    });
    seed_raw_document(&store, user_id, &seeded).await;

    let now = instant("2025-01-15T10:00:00Z");
    let outcome = gate_and_consume(&store, user_id, now, 300).await.unwrap();

    // Unreadable fields fall back to defaults: full trial, fresh day.
    match outcome {
        GateOutcome::Granted { usage } => {
            assert_eq!(usage.free_remaining, 2);
            assert_eq!(usage.daily_count, 1);
            assert_eq!(usage.tz_offset_minutes, 300);
        }
        GateOutcome::Denied(denial) => panic!("expected grant, got {}", denial.reason_code()),
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_grant_exactly_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_file_store(&temp_dir, "race.db").await;
    let user_id = Uuid::new_v4();
    let now = instant("2025-01-15T10:00:00Z");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            gate_and_consume(&store, user_id, now, 0).await
        }));
    }

    let mut grants = 0;
    let mut denials = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            GateOutcome::Granted { .. } => grants += 1,
            GateOutcome::Denied(denial) => {
                assert_eq!(denial.reason_code(), "FREE_DAILY_LIMIT");
                denials += 1;
            }
        }
    }

    assert_eq!(grants, 1, "free tier allows exactly one decision per day");
    assert_eq!(denials, 7);

    // The stored counters reflect a single charge.
    let document = store.get_user_document(user_id).await.unwrap().unwrap();
    assert_eq!(document.usage.decisions.daily_count, Some(1));
    assert_eq!(document.usage.decisions.free_remaining, Some(2));
}
