// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage
//!
//! Durable storage for accounts, users and identities behind the
//! [`CredentialStore`] trait. Two backends implement it:
//!
//! - [`RedbStore`]: embedded ACID database (production)
//! - [`InMemoryStore`]: process-local maps (tests, `IAM_DB_PATH=:memory:`)
//!
//! ## Guarantees
//!
//! - `create_account` writes the account, its root user and the root
//!   identity in one all-or-nothing unit.
//! - `(account_id, slug)` is unique, enforced inside the write itself.
//! - Only password hashes are persisted. Plaintext never reaches a row.
//! - Every call takes a [`CancellationToken`]; a cancelled write commits
//!   nothing.
//!
//! ## Naming
//!
//! User names passed to the store are account-relative (`users/{slug}`);
//! the account is always a separate argument.

pub mod database;
pub mod error;
pub mod memory;
pub mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::auth::PasswordHasher;
use crate::models::{Account, Identity, NewAccount, NewIdentity, NewUser, User};
use crate::names::{validate_slug, NameError, ResourceName, ACCOUNTS, DEFAULT_ROOT_SLUG, USERS};

pub use database::RedbStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use rows::{AccountRow, AccountRows, IdentityRow, UserRow};

/// Result of provisioning: the account with its root user and credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub account: Account,
    pub root: User,
    pub identity: Identity,
}

/// Storage capability set for the IAM core.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Compare `password` against the password identities of
    /// `account_name`/`user_name`. `Ok(false)` on mismatch; `NotFound` only
    /// when the user does not resolve. Both paths spend one password
    /// verification.
    async fn check_password(
        &self,
        cancel: &CancellationToken,
        account_name: &str,
        user_name: &str,
        password: &str,
    ) -> StorageResult<bool>;

    /// Atomically create an account, its root user and the root identity.
    async fn create_account(
        &self,
        cancel: &CancellationToken,
        account: &NewAccount,
        root: &NewUser,
        root_identity: &NewIdentity,
    ) -> StorageResult<ProvisionedAccount>;

    async fn get_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user_name: &str,
    ) -> StorageResult<User>;

    /// Create a non-root user. `AlreadyExists` on slug collision.
    async fn create_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user: &NewUser,
    ) -> StorageResult<User>;

    /// Hash and store a new credential for `parent_user_name`.
    async fn create_identity(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        parent_user_name: &str,
        identity: &NewIdentity,
    ) -> StorageResult<Identity>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Short backend label for logs.
    fn backend(&self) -> &'static str;
}

// =============================================================================
// Shared validation
// =============================================================================

pub(crate) fn ensure_active(cancel: &CancellationToken) -> StorageResult<()> {
    if cancel.is_cancelled() {
        Err(StorageError::Cancelled)
    } else {
        Ok(())
    }
}

/// `accounts/{id}` → `id`.
pub(crate) fn account_id_from_name(account_name: &str) -> StorageResult<String> {
    let parsed = ResourceName::parse(account_name, ACCOUNTS)?;
    if parsed.parent().is_some() {
        return Err(NameError::Malformed(account_name.to_string()).into());
    }
    Ok(parsed.id().to_string())
}

/// `users/{slug}` → `slug`. Account-qualified names are rejected here; the
/// account travels separately.
pub(crate) fn slug_from_user_name(user_name: &str) -> StorageResult<String> {
    let parsed = ResourceName::parse(user_name, USERS)?;
    if parsed.parent().is_some() {
        return Err(NameError::Malformed(user_name.to_string()).into());
    }
    validate_slug(parsed.id())?;
    Ok(parsed.id().to_string())
}

fn require_non_empty(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        Err(StorageError::InvalidArgument(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Validate every draft, hash the root password and build the rows to write.
/// Nothing is written; a failure here leaves storage untouched.
pub(crate) async fn prepare_account(
    hasher: &PasswordHasher,
    account: &NewAccount,
    root: &NewUser,
    root_identity: &NewIdentity,
    now: DateTime<Utc>,
) -> StorageResult<AccountRows> {
    require_non_empty("account.display_name", &account.display_name)?;
    let slug = match &root.name {
        Some(name) => slug_from_user_name(name)?,
        None => DEFAULT_ROOT_SLUG.to_string(),
    };
    let password_hash = hasher.hash_identity(root_identity).await?;

    let account_row = AccountRow::new(&account.display_name, now);
    let root_row = UserRow::new(&account_row.id, &slug, &root.display_name, true, now);
    let identity_row =
        IdentityRow::new(&root_row.id, root_identity.auth_method, password_hash, now);

    Ok(AccountRows {
        account: account_row,
        root: root_row,
        identity: identity_row,
    })
}

/// Validate a directly created user. The slug comes from the required name.
pub(crate) fn prepare_user(
    account_id: &str,
    user: &NewUser,
    now: DateTime<Utc>,
) -> StorageResult<UserRow> {
    let name = user
        .name
        .as_deref()
        .ok_or_else(|| StorageError::InvalidArgument("user.name is required".into()))?;
    let slug = slug_from_user_name(name)?;
    Ok(UserRow::new(account_id, &slug, &user.display_name, false, now))
}

// =============================================================================
// Backend conformance tests
// =============================================================================
