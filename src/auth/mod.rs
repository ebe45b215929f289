// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credentials and bearer tokens for the IAM service.
//!
//! ## Auth Flow
//!
//! 1. Client calls `POST /v0/authenticate` with `{account, user, password}`
//! 2. The store checks the password against the user's Argon2id hashes
//! 3. On success the token service signs an RS256 JWT:
//!    - `sub` → canonical user name (`users/{slug}`)
//!    - `aud` → bare account id
//!    - `amr` → `password`
//! 4. Client sends `Authorization: Bearer <token>` on later calls
//!
//! ## Security
//!
//! - Only RS256/RS384/RS512 tokens are accepted
//! - No clock skew leeway on `exp`
//! - Password hashing is bounded by a semaphore and runs off the async workers

pub mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use password::{PasswordError, PasswordHasher, PasswordPolicy};
pub use token::{TokenClaims, TokenKeys, TokenService};
