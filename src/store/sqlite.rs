// ABOUTME: SQLite-backed document store persisting one JSON document per user
// ABOUTME: Settles usage inside retried transactions so concurrent requests serialize
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! SQLite document store
//!
//! Documents live in a single `user_documents` table as JSON text. Reads
//! deserialize into the typed [`UserDocument`] view; writes re-read the raw
//! JSON inside a transaction, merge the owned subtree into it, and write the
//! whole document back. sqlx's default 5s busy timeout absorbs most write
//! contention; what still surfaces as `database is locked` is retried with
//! backoff.

use super::transactions::{retry_transaction, TransactionGuard};
use super::{
    merge_subtree, DocumentStore, SettlementFn, UsagePlan, DECISIONS_PATH, ENTITLEMENT_PATH,
};
use crate::models::{Entitlement, UserDocument};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Transaction attempts before a contended settlement gives up.
const MAX_TRANSACTION_RETRIES: u32 = 5;

/// SQLite-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` and run migrations.
    ///
    /// Plain `sqlite:` URLs get `?mode=rwc` appended so the database file is
    /// created on first use. In-memory databases are pinned to a single
    /// pooled connection, because every new SQLite connection would otherwise
    /// open its own fresh empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let connect_url = if database_url.starts_with("sqlite:")
            && !database_url.contains(":memory:")
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };
        let max_connections = if connect_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connect_url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite document store ready");
        Ok(store)
    }

    /// Access the underlying pool, mainly for test fixtures.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_documents (
                user_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        debug!("user_documents table ready");
        Ok(())
    }

    async fn merge_write(&self, user_id: Uuid, path: &[&str], leaf: &Value) -> Result<()> {
        retry_transaction(
            || async move {
                let transaction = self.pool.begin().await?;
                let mut guard = TransactionGuard::new(transaction);

                let mut raw = fetch_raw_document(guard.executor()?, user_id).await?;
                merge_subtree(&mut raw, path, leaf.clone());
                upsert_document(guard.executor()?, user_id, &raw).await?;

                guard.commit().await
            },
            MAX_TRANSACTION_RETRIES,
        )
        .await
    }
}

fn parse_document(raw: &str, user_id: Uuid) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow!("corrupt document for user {user_id}: {e}"))
}

fn typed_view(raw: &Value, user_id: Uuid) -> Result<UserDocument> {
    serde_json::from_value(raw.clone())
        .map_err(|e| anyhow!("malformed document shape for user {user_id}: {e}"))
}

async fn fetch_raw_document(
    executor: &mut sqlx::SqliteConnection,
    user_id: Uuid,
) -> Result<Value> {
    let row = sqlx::query("SELECT document FROM user_documents WHERE user_id = $1")
        .bind(user_id.to_string())
        .fetch_optional(executor)
        .await?;
    match row {
        Some(row) => {
            let stored: String = row.try_get("document")?;
            parse_document(&stored, user_id)
        }
        None => Ok(Value::Object(Map::new())),
    }
}

async fn upsert_document(
    executor: &mut sqlx::SqliteConnection,
    user_id: Uuid,
    document: &Value,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO user_documents (user_id, document, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET document = excluded.document, updated_at = excluded.updated_at
        ",
    )
    .bind(user_id.to_string())
    .bind(document.to_string())
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_user_document(&self, user_id: Uuid) -> Result<Option<UserDocument>> {
        let row = sqlx::query("SELECT document FROM user_documents WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let stored: String = row.try_get("document")?;
                let raw = parse_document(&stored, user_id)?;
                Ok(Some(typed_view(&raw, user_id)?))
            }
            None => Ok(None),
        }
    }

    async fn set_entitlement(&self, user_id: Uuid, entitlement: Entitlement) -> Result<()> {
        let leaf = serde_json::to_value(entitlement)?;
        self.merge_write(user_id, &ENTITLEMENT_PATH, &leaf).await
    }

    async fn settle_decision(&self, user_id: Uuid, plan: SettlementFn<'_>) -> Result<UsagePlan> {
        retry_transaction(
            || async move {
                let transaction = self.pool.begin().await?;
                let mut guard = TransactionGuard::new(transaction);

                let mut raw = fetch_raw_document(guard.executor()?, user_id).await?;
                let current = typed_view(&raw, user_id)?;

                let outcome = plan(&current);
                match &outcome {
                    UsagePlan::Grant(usage) => {
                        merge_subtree(&mut raw, &DECISIONS_PATH, serde_json::to_value(usage)?);
                        upsert_document(guard.executor()?, user_id, &raw).await?;
                        guard.commit().await?;
                    }
                    UsagePlan::Deny(denial) => {
                        debug!(
                            "Settlement denied for user {}: {}",
                            user_id,
                            denial.reason_code()
                        );
                        guard.rollback().await?;
                    }
                }
                Ok(outcome)
            },
            MAX_TRANSACTION_RETRIES,
        )
        .await
    }
}
