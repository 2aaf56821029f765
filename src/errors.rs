use thiserror::Error;
use uuid::Uuid;

/// Error type shared by the repository, stores, and configuration layer.
///
/// The pure pieces of the crate (expansion, aggregation, reserve math) never
/// produce one of these.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
    #[error("Batch write partially applied ({applied} of {total} operations)")]
    PartialWrite { applied: usize, total: usize },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the failed call may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
