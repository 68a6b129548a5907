// ABOUTME: In-memory document store for tests and local development
// ABOUTME: Mirrors the SQLite store's merge-write semantics over a concurrent map
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! In-memory document store
//!
//! Settlements hold the per-user map entry for the duration of the plan
//! callback, giving the same one-settlement-at-a-time guarantee the SQLite
//! store gets from transactions. The callback is synchronous, so no lock is
//! ever held across an await point.

use super::{
    merge_subtree, DocumentStore, SettlementFn, UsagePlan, DECISIONS_PATH, ENTITLEMENT_PATH,
};
use crate::models::{Entitlement, UserDocument};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory [`DocumentStore`] backed by a concurrent map.
///
/// Clones share the same underlying map, matching how pooled stores behave.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<Uuid, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user_document(&self, user_id: Uuid) -> Result<Option<UserDocument>> {
        match self.documents.get(&user_id) {
            Some(entry) => {
                let document = serde_json::from_value(entry.value().clone())
                    .map_err(|e| anyhow!("malformed document shape for user {user_id}: {e}"))?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn set_entitlement(&self, user_id: Uuid, entitlement: Entitlement) -> Result<()> {
        let leaf = serde_json::to_value(entitlement)?;
        let mut entry = self
            .documents
            .entry(user_id)
            .or_insert_with(|| Value::Object(Map::new()));
        merge_subtree(entry.value_mut(), &ENTITLEMENT_PATH, leaf);
        Ok(())
    }

    async fn settle_decision(&self, user_id: Uuid, plan: SettlementFn<'_>) -> Result<UsagePlan> {
        // The entry holds its shard lock through the plan callback, so
        // settlements for the same user serialize.
        match self.documents.entry(user_id) {
            Entry::Occupied(mut occupied) => {
                let current: UserDocument = serde_json::from_value(occupied.get().clone())
                    .map_err(|e| anyhow!("malformed document shape for user {user_id}: {e}"))?;
                let outcome = plan(&current);
                if let UsagePlan::Grant(usage) = &outcome {
                    merge_subtree(
                        occupied.get_mut(),
                        &DECISIONS_PATH,
                        serde_json::to_value(usage)?,
                    );
                }
                Ok(outcome)
            }
            Entry::Vacant(vacant) => {
                let outcome = plan(&UserDocument::default());
                if let UsagePlan::Grant(usage) = &outcome {
                    let mut raw = Value::Object(Map::new());
                    merge_subtree(&mut raw, &DECISIONS_PATH, serde_json::to_value(usage)?);
                    vacant.insert(raw);
                }
                Ok(outcome)
            }
        }
    }
}
