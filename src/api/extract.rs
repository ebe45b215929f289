// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request extractors.
//!
//! ```rust,ignore
//! async fn handler(
//!     BearerToken(token): BearerToken,
//!     cancel: RequestCancellation,
//! ) -> Result<Json<User>, IamError> {
//!     state.service.get_user(&cancel, &token, &name).await.map(Json)
//! }
//! ```

use std::convert::Infallible;
use std::ops::Deref;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::auth::AuthError;

/// Raw bearer token from `Authorization: Bearer <token>`.
///
/// The token is passed opaquely to the service, which verifies it.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        Ok(BearerToken(token.to_string()))
    }
}

/// Cancellation signal tied to the lifetime of the request.
///
/// The token fires when the handler future is dropped, whether because the
/// timeout layer gave up or the client went away. Storage calls observe it
/// and abort uncommitted writes.
pub struct RequestCancellation {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestCancellation {
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }
}

impl Default for RequestCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for RequestCancellation {
    type Target = CancellationToken;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new())
    }
}
