// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service-wide error taxonomy and its HTTP mapping.
//!
//! | Variant | Status | Raised for |
//! |---------|--------|------------|
//! | `InvalidArgument` | 400 | malformed name, missing field, unsupported auth method |
//! | `Unauthenticated` | 401 | bad credentials, bad or expired token, disallowed algorithm |
//! | `NotFound` | 404 | unknown account, user or parent |
//! | `AlreadyExists` | 409 | slug collision within an account |
//! | `Internal` | 500 | storage, signing or hashing failure |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthError, PasswordError};
use crate::names::NameError;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IamError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    /// The message is for logs only; clients see a generic body.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl IamError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            IamError::InvalidArgument(_) => "invalid_argument",
            IamError::Unauthenticated(_) => "unauthenticated",
            IamError::NotFound(_) => "not_found",
            IamError::AlreadyExists(_) => "already_exists",
            IamError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IamError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            IamError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            IamError::NotFound(_) => StatusCode::NOT_FOUND,
            IamError::AlreadyExists(_) => StatusCode::CONFLICT,
            IamError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NameError> for IamError {
    fn from(err: NameError) -> Self {
        IamError::InvalidArgument(err.to_string())
    }
}

impl From<AuthError> for IamError {
    fn from(err: AuthError) -> Self {
        if err.is_internal() {
            IamError::Internal(err.to_string())
        } else {
            IamError::Unauthenticated(err.to_string())
        }
    }
}

impl From<PasswordError> for IamError {
    fn from(err: PasswordError) -> Self {
        if err.is_invalid_argument() {
            IamError::InvalidArgument(err.to_string())
        } else {
            IamError::Internal(err.to_string())
        }
    }
}

impl From<StorageError> for IamError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => IamError::NotFound(err.to_string()),
            StorageError::Duplicate { .. } => IamError::AlreadyExists(err.to_string()),
            StorageError::InvalidName(name) => name.into(),
            StorageError::Password(password) => password.into(),
            StorageError::InvalidArgument(message) => IamError::InvalidArgument(message),
            other => IamError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for IamError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            IamError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            error,
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
