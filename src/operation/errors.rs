//! Error types for operation staging and dispatch
//!
//! Every failure the builder, key resolver, schedule wrapper or dispatcher can
//! produce is a variant of [`DispatchError`]. The dispatcher never lets one of
//! these escape: it folds them into the structured result shapes in
//! [`crate::operation::output`]. Only the builder's precondition check
//! ([`DispatchError::NoStagedOperation`]) is surfaced to direct callers of the
//! builder API as an `Err`.

use thiserror::Error;

/// Error type for all staging, resolution and dispatch operations
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A cross-cutting setter or consumer was called before any operation was staged
    ///
    /// This is a programming error in the calling layer.
    #[error("No operation has been staged on this builder")]
    NoStagedOperation,

    /// A key string could be parsed neither as a public nor as a private key
    #[error("Invalid key format for {field}: {reason}")]
    InvalidKeyFormat {
        /// The key-bearing field (or "key" when resolved standalone)
        field: String,
        /// Why the last parse attempt failed
        reason: String,
    },

    /// The `current_signer` token was used but no signer is configured
    #[error("No signer available to resolve the current signer's key for {field}")]
    NoSignerAvailable {
        /// The key-bearing field holding the unresolved token
        field: String,
    },

    /// Caller-supplied input failed validation before staging
    ///
    /// `index` is set when the offending value is an item of a list.
    #[error("{}", format_invalid_input(.field, .index, .reason))]
    InvalidInput {
        field: String,
        index: Option<usize>,
        reason: String,
    },

    /// The network client failed to finalize (freeze) an operation
    #[error("Finalization failed: {0}")]
    Finalization(String),

    /// An operation frozen for one payer was handed to a signer for another
    #[error("Operation was frozen for payer {frozen_payer} but signer acts as {signer}")]
    FrozenForDifferentPayer {
        frozen_payer: String,
        signer: String,
    },

    /// Signing or submission failed
    ///
    /// The message is the collaborator's, verbatim. `operation_id` is the id of
    /// the attempted operation when one had been assigned.
    #[error("{message}")]
    Submission {
        message: String,
        operation_id: Option<String>,
    },

    /// Encoding or decoding of operation bytes failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session or dispatcher configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_invalid_input(field: &str, index: &Option<usize>, reason: &str) -> String {
    match index {
        Some(i) => format!("Invalid input at item {} ({}): {}", i, field, reason),
        None => format!("Invalid input ({}): {}", field, reason),
    }
}

impl DispatchError {
    /// Check if this error is potentially retryable
    ///
    /// Only failures coming back from the network side can succeed on a
    /// second attempt; bad input and misuse never will.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Finalization(_) => true,
            Self::Submission { .. } => true,

            Self::NoStagedOperation => false,
            Self::InvalidKeyFormat { .. } => false,
            Self::NoSignerAvailable { .. } => false,
            Self::InvalidInput { .. } => false,
            Self::FrozenForDifferentPayer { .. } => false,
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoStagedOperation => "precondition",
            Self::InvalidKeyFormat { .. } => "validation",
            Self::InvalidInput { .. } => "validation",
            Self::NoSignerAvailable { .. } => "resolution",
            Self::Finalization(_) => "finalization",
            Self::FrozenForDifferentPayer { .. } => "precondition",
            Self::Submission { .. } => "submission",
            Self::Serialization(_) => "serialization",
            Self::Configuration(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// The attempted operation id, if this error carries one
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            Self::Submission { operation_id, .. } => operation_id.as_deref(),
            _ => None,
        }
    }
}

// Convenience constructors for common error scenarios
impl DispatchError {
    /// Create a validation error for a top-level field
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            index: None,
            reason: reason.into(),
        }
    }

    /// Create a validation error for one item of a list-valued field
    pub fn invalid_item(field: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            index: Some(index),
            reason: reason.into(),
        }
    }

    /// Create an invalid key format error
    pub fn invalid_key(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a submission error, keeping the collaborator's message as-is
    pub fn submission(message: impl Into<String>, operation_id: Option<String>) -> Self {
        Self::Submission {
            message: message.into(),
            operation_id,
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
