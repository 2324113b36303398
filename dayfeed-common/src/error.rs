//! Common error types for dayfeed

use thiserror::Error;

/// Common result type for dayfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the dayfeed crates
///
/// The first group mirrors how the feed degrades: everything except
/// `AuthFailure` and `LedgerWriteFailure` is absorbed at category level
/// and replaced by neutral content.
#[derive(Error, Debug)]
pub enum Error {
    /// No store or provider configured for this source
    #[error("Not configured: {0}")]
    ConfigurationMissing(String),

    /// Retryable network/transport failure
    #[error("Transport error: {0}")]
    TransientTransport(String),

    /// Request rejected by authentication
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Source returned a payload that could not be understood
    #[error("Invalid data: {0}")]
    DataInvalid(String),

    /// Acknowledgment could not be recorded
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailure(String),

    /// Rotation requested over an empty pool
    #[error("Cannot select from an empty pool")]
    EmptyPool,

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request field missing or malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry of the same operation could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientTransport(_))
    }
}
