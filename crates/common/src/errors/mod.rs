//! Error types for Mosaic
//!
//! Provides a single error enum for the consolidation engine with:
//! - Distinct variants for contract violations vs. backend failures
//! - Machine-readable error codes
//! - Retry classification for callers wrapping backend calls

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    TooManySubqueries,

    // Contract errors (4xxx)
    InvalidWindow,
    ShapeMismatch,
    InvalidMetadata,

    // Backend errors (8xxx)
    BackendError,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::TooManySubqueries => 1002,

            // Contract (4xxx)
            ErrorCode::InvalidWindow => 4001,
            ErrorCode::ShapeMismatch => 4002,
            ErrorCode::InvalidMetadata => 4003,

            // Backend (8xxx)
            ErrorCode::BackendError => 8001,

            // Internal (9xxx)
            ErrorCode::ConfigurationError => 9001,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Too many sub-queries: {count} exceeds limit of {limit}")]
    TooManySubqueries { count: usize, limit: usize },

    // Contract errors
    #[error("Invalid window input: {message}")]
    InvalidWindow { message: String },

    #[error("Result shape mismatch in sub-query {query_index}: expected {expected} items, found {found}")]
    ShapeMismatch {
        query_index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Document {id} has invalid metadata '{key}': {reason}")]
    InvalidMetadata {
        id: String,
        key: String,
        reason: String,
    },

    // Backend errors
    #[error("Vector store error: {message}")]
    Backend { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Shorthand for a validation error tied to a field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::TooManySubqueries { .. } => ErrorCode::TooManySubqueries,
            AppError::InvalidWindow { .. } => ErrorCode::InvalidWindow,
            AppError::ShapeMismatch { .. } => ErrorCode::ShapeMismatch,
            AppError::InvalidMetadata { .. } => ErrorCode::InvalidMetadata,
            AppError::Backend { .. } => ErrorCode::BackendError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Caller bugs and upstream corruption: never recovered, never retried
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidWindow { .. }
                | AppError::ShapeMismatch { .. }
                | AppError::InvalidMetadata { .. }
        )
    }

    /// Only backend failures are worth retrying, and the backend owns the retry policy
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Backend { .. })
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
