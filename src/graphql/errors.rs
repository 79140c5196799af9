//! Mutation error taxonomy
//!
//! Writes fail with one of three client-visible types: the row changed since
//! the caller last read it (`EXCLUSIVE`), a unique value is already taken
//! (`EXISTED`), or anything else (`UNKNOWN`).

use serde::{Deserialize, Serialize};

use crate::services::client::ClientError;

/// Error type reported to callers of a mutation
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Exclusive,
    Existed,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Exclusive => "EXCLUSIVE",
            ErrorType::Existed => "EXISTED",
            ErrorType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("{entity} {id} was modified or removed since it was last read")]
    Exclusive { entity: String, id: String },

    #[error("{entity} with this {field} already exists")]
    Existed { entity: String, field: String },

    #[error("{entity} mutation failed: {reason}")]
    Unknown { entity: String, reason: String },

    #[error(transparent)]
    Transport(#[from] ClientError),
}

impl MutationError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            MutationError::Exclusive { .. } => ErrorType::Exclusive,
            MutationError::Existed { .. } => ErrorType::Existed,
            MutationError::Unknown { .. } | MutationError::Transport(_) => ErrorType::Unknown,
        }
    }
}

pub type MutationResult<T> = Result<T, MutationError>;
