// ABOUTME: Document store abstraction over per-user JSON documents with merge-write semantics
// ABOUTME: Defines the settlement contract that makes gate-then-charge atomic per user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! User document storage
//!
//! Each user owns one JSON document. The advisor touches two subtrees of it:
//! `entitlement` (subscription state, written by billing flows) and
//! `usage.decisions` (quota counters, written by settlements). Writes replace
//! only the subtree they own; everything else in the document, including
//! fields written by other backend components, survives byte-for-byte.
//!
//! `settle_decision` is the concurrency boundary. The whole
//! read-evaluate-write cycle for one request runs inside it, so two requests
//! racing for a user's last daily credit cannot both win.

/// In-memory store for tests and local development
pub mod memory;

/// SQLite-backed store with transactional settlements
pub mod sqlite;

/// Retry and rollback helpers shared by transactional backends
pub mod transactions;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{DecisionUsage, Entitlement, GateDenial, UserDocument};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Document path of the decision usage subtree.
pub(crate) const DECISIONS_PATH: [&str; 2] = ["usage", "decisions"];

/// Document path of the entitlement subtree.
pub(crate) const ENTITLEMENT_PATH: [&str; 1] = ["entitlement"];

/// What a settlement callback decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsagePlan {
    /// Deny the request and leave the stored document untouched.
    Deny(GateDenial),
    /// Grant the request and persist the updated usage counters.
    Grant(DecisionUsage),
}

impl UsagePlan {
    /// True when the plan grants the request.
    #[must_use]
    pub const fn is_grant(&self) -> bool {
        matches!(self, Self::Grant(_))
    }
}

/// Gate callback invoked inside the store's atomic read-modify-write.
///
/// The callback sees the freshest persisted document and must stay pure:
/// transactional backends invoke it again when a contended settlement
/// retries, each time against re-read state.
pub type SettlementFn<'a> = &'a (dyn Fn(&UserDocument) -> UsagePlan + Send + Sync);

/// Per-user document storage with merge-write semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a user's document, or `None` when the user has no record yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend read fails or the stored document is
    /// not valid JSON.
    async fn get_user_document(&self, user_id: Uuid) -> Result<Option<UserDocument>>;

    /// Replace the `entitlement` subtree of a user's document, creating the
    /// document if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend write fails.
    async fn set_entitlement(&self, user_id: Uuid, entitlement: Entitlement) -> Result<()>;

    /// Atomically read the user's document, let `plan` decide, and persist
    /// the granted usage (if any) before releasing the user's record.
    ///
    /// A [`UsagePlan::Deny`] leaves the document unchanged. Concurrent
    /// settlements for the same user serialize, so each callback sees the
    /// counters left by the previous grant.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend transaction fails after retries.
    async fn settle_decision(&self, user_id: Uuid, plan: SettlementFn<'_>) -> Result<UsagePlan>;
}

/// Replace the subtree at `path` inside `document`, creating missing parents.
///
/// Non-object nodes along the path are replaced by fresh objects. Siblings at
/// every level are preserved.
pub(crate) fn merge_subtree(document: &mut Value, path: &[&str], leaf: Value) {
    match path.split_first() {
        None => *document = leaf,
        Some((key, rest)) => {
            if !document.is_object() {
                *document = Value::Object(Map::new());
            }
            if let Some(children) = document.as_object_mut() {
                let child = children.entry(*key).or_insert(Value::Null);
                merge_subtree(child, rest, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn merge_replaces_only_the_target_subtree() {
        let mut document = json!({
            "entitlement": { "isSubscribed": true },
            "profile": { "displayName": "Sam" },
            "usage": {
                "decisions": { "dailyCount": 2 },
                "mealScans": { "dailyCount": 9 }
            }
        });

        merge_subtree(
            &mut document,
            &DECISIONS_PATH,
            json!({ "dailyCount": 3, "freeRemaining": 0 }),
        );

        assert_eq!(document["usage"]["decisions"]["dailyCount"], 3);
        assert_eq!(document["usage"]["decisions"]["freeRemaining"], 0);
        assert_eq!(document["usage"]["mealScans"]["dailyCount"], 9);
        assert_eq!(document["profile"]["displayName"], "Sam");
        assert_eq!(document["entitlement"]["isSubscribed"], true);
    }

    #[test]
    fn merge_creates_missing_parents() {
        let mut document = json!({});
        merge_subtree(&mut document, &DECISIONS_PATH, json!({ "dailyCount": 1 }));
        assert_eq!(document, json!({ "usage": { "decisions": { "dailyCount": 1 } } }));
    }

    #[test]
    fn merge_overwrites_non_object_nodes_on_the_path() {
        let mut document = json!({ "usage": "corrupted" });
        merge_subtree(&mut document, &DECISIONS_PATH, json!({ "dailyCount": 1 }));
        assert_eq!(document["usage"]["decisions"]["dailyCount"], 1);
    }

    #[test]
    fn merge_with_empty_path_replaces_the_document() {
        let mut document = json!({ "old": true });
        merge_subtree(&mut document, &[], json!({ "new": true }));
        assert_eq!(document, json!({ "new": true }));
    }

    #[test]
    fn plan_reports_grant_state() {
        use chrono::NaiveDate;

        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert!(UsagePlan::Grant(DecisionUsage::fresh(date, 0)).is_grant());
        assert!(!UsagePlan::Deny(GateDenial::FreeExhausted).is_grant());
    }
}
