// ABOUTME: Unified error handling for the Milo training advisor
// ABOUTME: Stable machine-readable error codes plus the sanitizer rejection type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Milo Fitness

//! # Error Types
//!
//! All fallible advisor operations return [`AdvisorResult`]. Errors carry a
//! stable [`ErrorCode`] so callers (and HTTP adapters) can branch on the code
//! instead of parsing messages. The recommendation trust boundary has its own
//! [`SanitizeError`] because rejected candidates are expected in normal
//! operation and callers need the rejection reason as data.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable error codes for all advisor operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Caller-supplied data failed validation (non-finite signals, bad dates)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    /// A recommendation candidate did not survive the trust boundary
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat,
    /// A usage limit was hit; details say which one and when it lifts
    #[serde(rename = "QUOTA_EXCEEDED")]
    QuotaExceeded,
    /// The document store failed or the transaction could not settle
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    /// JSON could not be serialized or deserialized
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError,
    /// Configuration was missing or unparseable
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// HTTP status code this error maps to at an API edge
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::InvalidFormat => 422,
            Self::QuotaExceeded => 429,
            Self::DatabaseError | Self::SerializationError | Self::ConfigError | Self::InternalError => 500,
        }
    }

    /// Stable string form of the code, identical to the serde rename
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Human-readable description of the error category
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "Request data failed validation",
            Self::InvalidFormat => "Data does not match the expected schema",
            Self::QuotaExceeded => "A usage limit was exceeded",
            Self::DatabaseError => "Document store operation failed",
            Self::SerializationError => "Serialization or deserialization failed",
            Self::ConfigError => "Configuration is missing or invalid",
            Self::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured context attached to an error for logging and debugging
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// User the failing operation was acting on behalf of
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Free-form structured details (limit values, reset times, field names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application error with a stable code, message, and optional context
#[derive(Debug)]
pub struct AdvisorError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable message describing this specific failure
    pub message: String,
    /// Optional structured context
    pub context: Option<ErrorContext>,
    /// Underlying cause, when one exists
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AdvisorError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            source: None,
        }
    }

    /// Attach the user the operation was acting for
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context
            .get_or_insert_with(ErrorContext::default)
            .user_id = Some(user_id);
        self
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(ErrorContext::default)
            .details = Some(details);
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    // ============================================================================
    // Convenience constructors
    // ============================================================================

    /// Caller-supplied data failed validation
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Data does not match the expected schema
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFormat, message)
    }

    /// A usage limit was exceeded
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::QuotaExceeded, message)
    }

    /// Document store operation failed
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Serialization or deserialization failed
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// Configuration is missing or invalid
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Unexpected internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AdvisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string()).with_source(err)
    }
}

impl From<anyhow::Error> for AdvisorError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        Self::internal(message).with_source(err)
    }
}

/// Result alias used by all advisor services
pub type AdvisorResult<T> = Result<T, AdvisorError>;

// ============================================================================
// Sanitizer errors
// ============================================================================

/// Rejection raised while sanitizing an untrusted recommendation candidate
///
/// These are expected failures: any external recommendation source can return
/// malformed output, and callers fall back to the deterministic heuristic when
/// they see one. The variant (and its [`code`](Self::code)) says which stage
/// of the pipeline rejected the candidate.
#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    /// Raw text from the source could not be parsed as JSON at all
    #[error("recommendation source returned unparseable JSON: {source}")]
    InvalidJson {
        /// Parse failure from the full-text attempt
        #[source]
        source: serde_json::Error,
    },
    /// Normalized explanation fell outside the allowed bullet count
    #[error("explanation must carry {min}-{max} bullets, got {count}")]
    InvalidExplanationCount {
        /// Bullets remaining after normalization
        count: usize,
        /// Smallest accepted bullet count
        min: usize,
        /// Largest accepted bullet count
        max: usize,
    },
    /// Candidate did not match the trusted recommendation schema
    #[error("recommendation candidate rejected: {reason}")]
    InvalidOutput {
        /// What the schema check objected to
        reason: String,
    },
}

impl SanitizeError {
    /// Stable lowercase code for logs and metrics
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "invalid_json",
            Self::InvalidExplanationCount { .. } => "invalid_explanation_count",
            Self::InvalidOutput { .. } => "invalid_output",
        }
    }
}

impl From<SanitizeError> for AdvisorError {
    fn from(err: SanitizeError) -> Self {
        Self::invalid_format(err.to_string())
            .with_details(serde_json::json!({ "sanitize_code": err.code() }))
            .with_source(err)
    }
}
