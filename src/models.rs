// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Entities handed across the service boundary and the request/response
//! bodies of the HTTP API. All externally visible entities are addressed by
//! their resource name (see [`crate::names`]); storage identifiers never leak.
//!
//! ## Model Categories
//!
//! - **Entities**: [`Account`], [`User`], [`Identity`]
//! - **Drafts**: caller-supplied input for creation ([`NewAccount`], [`NewUser`], [`NewIdentity`])
//! - **Requests/Responses**: API bodies

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Auth Method
// =============================================================================

/// Credential type of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Not set by the caller; always rejected.
    #[default]
    Unspecified,
    /// Salted, adaptively hashed password.
    Password,
}

impl AuthMethod {
    /// Wire and storage representation (also used as the `amr` claim).
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Unspecified => "unspecified",
            AuthMethod::Password => "password",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unspecified" => Ok(AuthMethod::Unspecified),
            "password" => Ok(AuthMethod::Password),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Account {
    /// `accounts/{id}`
    pub name: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<DateTime<Utc>>,
    pub display_name: String,
    /// Name of the root user, `users/{slug}`.
    pub root: String,
}

/// A principal scoped to one account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    /// `users/{slug}`, relative to the owning account.
    pub name: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<DateTime<Utc>>,
    pub display_name: String,
    pub is_root: bool,
}

/// A credential bound to a user. Never carries password material.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Identity {
    /// `users/{slug}/identities/{id}`
    pub name: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<DateTime<Utc>>,
    pub auth_method: AuthMethod,
}

// =============================================================================
// Drafts
// =============================================================================

/// Caller-supplied account fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct NewAccount {
    pub display_name: String,
}

/// Caller-supplied user fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct NewUser {
    /// `users/{slug}`. Optional only for the root user of a new account.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: String,
}

/// Caller-supplied credential. The plaintext password is consumed by the
/// store's hasher and never persisted, logged, or echoed back.
#[derive(Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct NewIdentity {
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub password: String,
}

impl NewIdentity {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            auth_method: AuthMethod::Password,
            password: password.into(),
        }
    }
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("auth_method", &self.auth_method)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Requests / Responses
// =============================================================================

/// Body of `POST /v0/authenticate`.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    /// `accounts/{id}`
    pub account: String,
    /// `users/{slug}`
    pub user: String,
    pub password: String,
}

impl fmt::Debug for AuthenticateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateRequest")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signed bearer token issued on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticateResponse {
    pub token: String,
}

/// Body of `POST /v0/accounts`.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub account: NewAccount,
    pub root: NewUser,
    pub root_password: String,
}

impl fmt::Debug for CreateAccountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateAccountRequest")
            .field("account", &self.account)
            .field("root", &self.root)
            .field("root_password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /v0/users`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub user: NewUser,
}

/// Body of `POST /v0/users/{slug}/identities`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateIdentityRequest {
    pub identity: NewIdentity,
}
