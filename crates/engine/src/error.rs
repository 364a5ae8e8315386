use serde::Serialize;
use thiserror::Error;

use crate::wallet::Currency;

/// The taxonomy kind reported to callers for any failed pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Configuration,
    InsufficientResources,
    InvalidRequest,
    PersistenceConflict,
    Storage,
}

#[derive(Debug, Error)]
pub enum SummonError {
    /// Broken banner configuration. Caught at save time; reaching it at pull
    /// time aborts the batch and is never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("insufficient {currency}: required {required}, available {available}")]
    InsufficientResources {
        currency: Currency,
        required: i64,
        available: i64,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("concurrent update on player {player}")]
    PersistenceConflict { player: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl SummonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummonError::Configuration(_) => ErrorKind::Configuration,
            SummonError::InsufficientResources { .. } => ErrorKind::InsufficientResources,
            SummonError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SummonError::PersistenceConflict { .. } => ErrorKind::PersistenceConflict,
            SummonError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SummonError::PersistenceConflict { .. })
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SummonError::Configuration(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SummonError::InvalidRequest(msg.into())
    }
}

impl From<serde_json::Error> for SummonError {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

pub type SummonResult<T> = Result<T, SummonError>;
