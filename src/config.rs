// ABOUTME: Environment configuration for the advisor: database location and logging behavior
// ABOUTME: Parses environment variables into typed settings with sensible local defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! Environment-based configuration

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Connection string used when no database variable is set.
const DEFAULT_DATABASE_URL: &str = "sqlite:milo_advisor.db";

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// SQLite database file
    Sqlite {
        /// Path to the database file
        path: PathBuf,
    },
    /// In-memory SQLite, for tests and throwaway runs
    Memory,
}

impl DatabaseUrl {
    /// Parse a connection string.
    ///
    /// Strings without a scheme are treated as SQLite file paths.
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        if let Some(path) = s.strip_prefix("sqlite:") {
            if path == ":memory:" {
                Self::Memory
            } else {
                Self::Sqlite {
                    path: PathBuf::from(path),
                }
            }
        } else {
            Self::Sqlite {
                path: PathBuf::from(s),
            }
        }
    }

    /// Render the connection string sqlx expects.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Whether this is an in-memory database.
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(DEFAULT_DATABASE_URL)
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Top-level advisor configuration
#[derive(Debug, Clone, Default)]
pub struct AdvisorConfig {
    /// Where user documents live
    pub database_url: DatabaseUrl,
    /// Logging behavior
    pub logging: LoggingConfig,
}

impl AdvisorConfig {
    /// Load configuration from environment variables.
    ///
    /// `MILO_DATABASE_URL` wins over `DATABASE_URL`; with neither set, a
    /// local SQLite file is used. Logging settings come from
    /// [`LoggingConfig::from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        let raw_url = env::var("MILO_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        Self {
            database_url: DatabaseUrl::parse_url(&raw_url),
            logging: LoggingConfig::from_env(),
        }
    }
}
