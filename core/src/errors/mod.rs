//! Error types returned by the verification code cache and its store.

use thiserror::Error;

/// Errors visible to callers of the verification code cache
///
/// `Unknown` carries no cause: store and serialization failures
/// are logged where they happen and collapse into this single variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeCacheError {
    #[error("Verification code requested too frequently")]
    CodeSendTooMany,

    #[error("Verification attempted too many times")]
    CodeVerifyTooManyTimes,

    #[error("Invalid argument: {field} must not be empty")]
    InvalidArgument { field: &'static str },

    #[error("Unknown verification code error")]
    Unknown,
}

impl CodeCacheError {
    /// Whether the error is a policy decision rather than a failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CodeCacheError::CodeSendTooMany | CodeCacheError::CodeVerifyTooManyTimes
        )
    }
}

pub type CodeCacheResult<T> = Result<T, CodeCacheError>;

/// Failures reported by an expiring store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Value of {size} bytes exceeds the {max} byte limit")]
    ValueTooLarge { size: usize, max: usize },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
