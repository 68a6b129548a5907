// ABOUTME: Transaction retry and guard utilities for the SQLite document store
// ABOUTME: Retries busy/locked failures with backoff and logs transactions dropped uncommitted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! Transaction helpers for the SQLite store
//!
//! SQLite reports write contention as `database is locked` / `busy` errors
//! instead of queueing writers indefinitely. [`retry_transaction`] re-runs a
//! settlement closure with exponential backoff for those failures, and
//! [`TransactionGuard`] makes transactions that fall out of scope without an
//! explicit commit visible in the logs.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Retry an async operation when the failure is transient lock contention.
///
/// The closure is invoked fresh on every attempt and must begin its own
/// transaction, so a retry always starts from the latest committed state.
/// Non-retryable errors are returned immediately.
///
/// # Errors
///
/// Returns the last error once `max_retries` attempts are exhausted, or the
/// first error that [`is_retryable_error`] classifies as permanent.
pub async fn retry_transaction<F, Fut, T>(mut operation: F, max_retries: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempts += 1;
                if attempts >= max_retries {
                    error!("Transaction failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }

                if is_retryable_error(&format!("{e:?}")) {
                    let delay = Duration::from_millis(10 * (1 << attempts));
                    warn!(
                        "Retryable transaction error (attempt {}/{}), retrying in {:?}: {}",
                        attempts, max_retries, delay, e
                    );
                    sleep(delay).await;
                } else {
                    return Err(e);
                }
            }
        }
    }
}

/// Classify an error message as transient lock contention.
///
/// sqlx surfaces SQLite busy conditions as `database is locked` or
/// `database table is locked`; snapshot upgrade conflicts under WAL surface
/// as `busy`. Constraint violations and connection failures are permanent
/// and must not be retried.
#[must_use]
pub fn is_retryable_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();

    // Permanent failures first, so messages that mention both (for example a
    // constraint error raised while a table was locked) never loop.
    if lower.contains("constraint")
        || lower.contains("connection refused")
        || lower.contains("permission denied")
    {
        return false;
    }

    lower.contains("database is locked")
        || lower.contains("locked")
        || lower.contains("busy")
        || lower.contains("timed out")
        || lower.contains("timeout")
}

/// RAII wrapper around a SQLite transaction.
///
/// sqlx already rolls an uncommitted transaction back on drop; the guard adds
/// a warning log so settlements that bail out through `?` without reaching an
/// explicit commit or rollback show up during debugging.
pub struct TransactionGuard<'c> {
    transaction: Option<sqlx::Transaction<'c, sqlx::Sqlite>>,
    committed: bool,
}

impl<'c> TransactionGuard<'c> {
    /// Wrap a freshly begun transaction.
    #[must_use]
    pub fn new(transaction: sqlx::Transaction<'c, sqlx::Sqlite>) -> Self {
        debug!("Transaction started");
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails or the transaction was already
    /// consumed.
    pub async fn commit(mut self) -> Result<()> {
        match self.transaction.take() {
            Some(transaction) => {
                transaction.commit().await?;
                self.committed = true;
                debug!("Transaction committed");
                Ok(())
            }
            None => Err(anyhow!("transaction already consumed")),
        }
    }

    /// Roll the transaction back explicitly (the deny path).
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails or the transaction was already
    /// consumed.
    pub async fn rollback(mut self) -> Result<()> {
        match self.transaction.take() {
            Some(transaction) => {
                transaction.rollback().await?;
                debug!("Transaction rolled back");
                Ok(())
            }
            None => Err(anyhow!("transaction already consumed")),
        }
    }

    /// Whether the transaction was committed.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    /// Executor for running queries inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction was already consumed.
    pub fn executor(&mut self) -> Result<&mut sqlx::SqliteConnection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| anyhow!("transaction already consumed"))
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            warn!("Transaction dropped without commit, rolling back");
        }
    }
}
