// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage error types.

use crate::auth::PasswordError;
use crate::names::NameError;

/// Errors raised by [`CredentialStore`](super::CredentialStore) backends.
///
/// Backend-specific failures (redb, serialization, worker panics) are kept
/// distinct for logging but all classify as internal faults.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    #[error("{entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("request cancelled")]
    Cancelled,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal storage error: {0}")]
    Internal(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    #[must_use]
    pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn duplicate(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Whether the caller supplied a bad name, field or credential draft.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Self::InvalidName(_) | Self::InvalidArgument(_) => true,
            Self::Password(err) => err.is_invalid_argument(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(StorageError::not_found("user", "users/a").is_not_found());
        assert!(StorageError::duplicate("user", "slug", "a").is_duplicate());
        assert!(StorageError::from(NameError::Empty).is_invalid_argument());
        assert!(StorageError::from(PasswordError::Empty).is_invalid_argument());
        assert!(!StorageError::from(PasswordError::Hash("x".into())).is_invalid_argument());
        assert!(!StorageError::Cancelled.is_invalid_argument());
    }

    #[test]
    fn messages_name_the_entity() {
        let err = StorageError::duplicate("user", "slug", "alice");
        assert_eq!(err.to_string(), "user with slug 'alice' already exists");
    }
}
