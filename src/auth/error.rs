// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Returned by bearer extraction, token issuance and token verification.
/// Everything except key/signing failures is an `Unauthenticated` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token declares a signing algorithm outside the RSA family
    DisallowedAlgorithm(String),
    /// A required claim is absent
    MissingClaim(String),
    /// Token is not valid for the requested account
    InvalidAudience,
    /// No signing key configured
    SigningKeyMissing,
    /// No verification key configured
    VerifyingKeyMissing,
    /// Signing failed
    SigningFailed(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::DisallowedAlgorithm(_) => "disallowed_algorithm",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::SigningKeyMissing => "signing_key_missing",
            AuthError::VerifyingKeyMissing => "verifying_key_missing",
            AuthError::SigningFailed(_) => "signing_failed",
        }
    }

    /// Whether this is a server-side fault rather than a bad credential.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::SigningKeyMissing
                | AuthError::VerifyingKeyMissing
                | AuthError::SigningFailed(_)
        )
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        if self.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::DisallowedAlgorithm(alg) => {
                write!(f, "Token signing algorithm {alg} is not accepted")
            }
            AuthError::MissingClaim(claim) => write!(f, "Token is missing the '{claim}' claim"),
            AuthError::InvalidAudience => write!(f, "Token is not valid for this account"),
            AuthError::SigningKeyMissing => write!(f, "No token signing key is configured"),
            AuthError::VerifyingKeyMissing => {
                write!(f, "No token verification key is configured")
            }
            AuthError::SigningFailed(msg) => write!(f, "Failed to sign token: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = if self.is_internal() {
            tracing::error!(error = %self, "token service failure");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(AuthErrorBody {
            error,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
