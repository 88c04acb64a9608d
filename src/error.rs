//! Error handling types for reflens
//!
//! `LspError` covers server plumbing (language loading, queries, file access). Errors raised while computing code lenses live next to the code
//! that raises them: `IndexError` in [`crate::references`] and `LensError` in
//! [`crate::analysis::code_lens`].

use std::sync::PoisonError;
use thiserror::Error;

/// Comprehensive error type for LSP operations
#[derive(Debug, Error)]
pub enum LspError {
    /// Parser not found for the specified language
    #[error("Parser not found for language: {language}")]
    ParserNotFound { language: String },

    /// Language configuration not found
    #[error("Language not found: {language}")]
    LanguageNotFound { language: String },

    /// Query loading or compilation failed
    #[error("Query error: {message}")]
    Query { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for LSP operations
pub type LspResult<T> = Result<T, LspError>;

/// Recovery for poisoned locks
///
/// Every lock in the server guards plain data that stays consistent across a
/// panicking holder, so the guard is always taken back.
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        self.unwrap_or_else(|poisoned| {
            log::warn!(
                target: "reflens::lock_recovery",
                "Recovered from poisoned lock in {}",
                context
            );
            poisoned.into_inner()
        })
    }
}

/// Helper functions for common error patterns
impl LspError {
    /// Create a parser not found error
    pub fn parser_not_found(language: impl Into<String>) -> Self {
        LspError::ParserNotFound {
            language: language.into(),
        }
    }

    /// Create a language not found error
    pub fn language_not_found(language: impl Into<String>) -> Self {
        LspError::LanguageNotFound {
            language: language.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        LspError::Query {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LspError::Internal(message.into())
    }
}
