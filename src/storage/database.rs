// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized AccountRow
//! - `users`: user_id → serialized UserRow
//! - `user_slugs`: `account_id/slug` → user_id (the uniqueness constraint)
//! - `identities`: identity_id → serialized IdentityRow
//! - `user_identities`: `user_id/identity_id` → auth method
//!
//! Every mutating call runs in one write transaction on the blocking pool.
//! redb admits a single writer at a time, so a slug check and the insert
//! that follows it cannot interleave with another writer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction};
use tokio_util::sync::CancellationToken;

use super::{
    account_id_from_name, ensure_active, prepare_account, prepare_user, slug_from_user_name,
    AccountRows, CredentialStore, IdentityRow, ProvisionedAccount, StorageError, StorageResult,
    UserRow,
};
use crate::auth::PasswordHasher;
use crate::models::{AuthMethod, Identity, NewAccount, NewIdentity, NewUser, User};
use crate::names::{account_name, user_name};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNT_ROWS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

const USER_ROWS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Key format: `account_id/slug`.
const USER_SLUG_INDEX: TableDefinition<&str, &str> = TableDefinition::new("user_slugs");

const IDENTITY_ROWS: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Key format: `user_id/identity_id`, scanned by user prefix.
const USER_IDENTITY_INDEX: TableDefinition<&str, &str> = TableDefinition::new("user_identities");

// =============================================================================
// Index Key Helpers
// =============================================================================

fn slug_key(account_id: &str, slug: &str) -> String {
    format!("{account_id}/{slug}")
}

fn identity_key(user_id: &str, identity_id: &str) -> String {
    format!("{user_id}/{identity_id}")
}

/// Range covering every `user_identities` key of one user.
/// `'0'` is the byte after `'/'`, so the end bound sits just past the prefix.
fn identity_range(user_id: &str) -> (String, String) {
    (format!("{user_id}/"), format!("{user_id}0"))
}

// =============================================================================
// Row access (shared by read and write transactions)
// =============================================================================

fn find_user<S, U>(
    slugs: &S,
    users: &U,
    account_id: &str,
    slug: &str,
) -> StorageResult<Option<UserRow>>
where
    S: ReadableTable<&'static str, &'static str>,
    U: ReadableTable<&'static str, &'static [u8]>,
{
    let user_id = match slugs.get(slug_key(account_id, slug).as_str())? {
        Some(value) => value.value().to_string(),
        None => return Ok(None),
    };
    match users.get(user_id.as_str())? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Err(StorageError::Internal(format!(
            "slug index points at missing user {user_id}"
        ))),
    }
}

fn password_hashes<I, R>(index: &I, identities: &R, user_id: &str) -> StorageResult<Vec<String>>
where
    I: ReadableTable<&'static str, &'static str>,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let (prefix, prefix_end) = identity_range(user_id);
    let mut hashes = Vec::new();

    for entry in index.range(prefix.as_str()..prefix_end.as_str())? {
        let (key, method) = entry?;
        if method.value() != AuthMethod::Password.as_str() {
            continue;
        }
        let identity_id = &key.value()[prefix.len()..];
        if let Some(value) = identities.get(identity_id)? {
            let row: IdentityRow = serde_json::from_slice(value.value())?;
            hashes.push(row.password_hash);
        }
    }
    Ok(hashes)
}

fn insert_user(
    users: &mut Table<&'static str, &'static [u8]>,
    slugs: &mut Table<&'static str, &'static str>,
    row: &UserRow,
) -> StorageResult<()> {
    let key = slug_key(&row.account_id, &row.slug);
    if slugs.get(key.as_str())?.is_some() {
        return Err(StorageError::duplicate("user", "slug", &row.slug));
    }
    slugs.insert(key.as_str(), row.id.as_str())?;

    let json = serde_json::to_vec(row)?;
    users.insert(row.id.as_str(), json.as_slice())?;
    Ok(())
}

fn insert_identity(
    identities: &mut Table<&'static str, &'static [u8]>,
    index: &mut Table<&'static str, &'static str>,
    row: &IdentityRow,
) -> StorageResult<()> {
    let json = serde_json::to_vec(row)?;
    identities.insert(row.id.as_str(), json.as_slice())?;

    let key = identity_key(&row.user_id, &row.id);
    index.insert(key.as_str(), row.auth_method.as_str())?;
    Ok(())
}

/// Write all three provisioning rows into `txn` without committing.
fn stage_account(
    txn: &WriteTransaction,
    rows: &AccountRows,
    cancel: &CancellationToken,
) -> StorageResult<()> {
    let mut accounts = txn.open_table(ACCOUNT_ROWS)?;
    let mut users = txn.open_table(USER_ROWS)?;
    let mut slugs = txn.open_table(USER_SLUG_INDEX)?;
    let mut identities = txn.open_table(IDENTITY_ROWS)?;
    let mut index = txn.open_table(USER_IDENTITY_INDEX)?;

    let json = serde_json::to_vec(&rows.account)?;
    accounts.insert(rows.account.id.as_str(), json.as_slice())?;
    ensure_active(cancel)?;

    insert_user(&mut users, &mut slugs, &rows.root)?;
    ensure_active(cancel)?;

    insert_identity(&mut identities, &mut index, &rows.identity)
}

/// Commit `txn`, or abort it if the request was cancelled meanwhile.
fn commit_unless_cancelled(txn: WriteTransaction, cancel: &CancellationToken) -> StorageResult<()> {
    if cancel.is_cancelled() {
        txn.abort()?;
        return Err(StorageError::Cancelled);
    }
    txn.commit()?;
    Ok(())
}

// =============================================================================
// RedbStore
// =============================================================================

/// Embedded ACID credential store.
pub struct RedbStore {
    db: Arc<Database>,
    hasher: PasswordHasher,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path, hasher: PasswordHasher) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Internal(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNT_ROWS)?;
            let _ = write_txn.open_table(USER_ROWS)?;
            let _ = write_txn.open_table(USER_SLUG_INDEX)?;
            let _ = write_txn.open_table(IDENTITY_ROWS)?;
            let _ = write_txn.open_table(USER_IDENTITY_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            hasher,
        })
    }

    /// Run `work` on the blocking pool. The token travels with it so a write
    /// can abort before commit once the caller goes away.
    async fn blocking<T, F>(&self, cancel: &CancellationToken, work: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &CancellationToken) -> StorageResult<T> + Send + 'static,
    {
        ensure_active(cancel)?;
        let db = Arc::clone(&self.db);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || work(&db, &cancel))
            .await
            .map_err(|e| StorageError::Internal(format!("storage worker failed: {e}")))?
    }
}

#[async_trait]
impl CredentialStore for RedbStore {
    async fn check_password(
        &self,
        cancel: &CancellationToken,
        account_name: &str,
        user_name: &str,
        password: &str,
    ) -> StorageResult<bool> {
        let account_id = account_id_from_name(account_name)?;
        let slug = slug_from_user_name(user_name)?;
        let user_ref = user_name.to_string();

        let hashes = self
            .blocking(cancel, move |db, _| {
                let read_txn = db.begin_read()?;
                let slugs = read_txn.open_table(USER_SLUG_INDEX)?;
                let users = read_txn.open_table(USER_ROWS)?;
                let user = find_user(&slugs, &users, &account_id, &slug)?
                    .ok_or_else(|| StorageError::not_found("user", user_ref))?;

                let index = read_txn.open_table(USER_IDENTITY_INDEX)?;
                let identities = read_txn.open_table(IDENTITY_ROWS)?;
                password_hashes(&index, &identities, &user.id)
            })
            .await;
        let hashes = match hashes {
            Ok(hashes) => hashes,
            Err(err) if err.is_not_found() => {
                self.hasher.verify_dummy(password).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        ensure_active(cancel)?;
        Ok(self.hasher.verify_any(password, hashes).await?)
    }

    async fn create_account(
        &self,
        cancel: &CancellationToken,
        account: &NewAccount,
        root: &NewUser,
        root_identity: &NewIdentity,
    ) -> StorageResult<ProvisionedAccount> {
        let rows = prepare_account(&self.hasher, account, root, root_identity, Utc::now()).await?;

        self.blocking(cancel, move |db, cancel| {
            let txn = db.begin_write()?;
            stage_account(&txn, &rows, cancel)?;
            commit_unless_cancelled(txn, cancel)?;

            Ok(ProvisionedAccount {
                account: rows.account.to_model(&rows.root),
                root: rows.root.to_model(),
                identity: rows.identity.to_model(&rows.root),
            })
        })
        .await
    }

    async fn get_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user_name: &str,
    ) -> StorageResult<User> {
        let slug = slug_from_user_name(user_name)?;
        let account_id = account_id.to_string();
        let user_ref = user_name.to_string();

        self.blocking(cancel, move |db, _| {
            let read_txn = db.begin_read()?;
            let slugs = read_txn.open_table(USER_SLUG_INDEX)?;
            let users = read_txn.open_table(USER_ROWS)?;
            find_user(&slugs, &users, &account_id, &slug)?
                .map(|row| row.to_model())
                .ok_or_else(|| StorageError::not_found("user", user_ref))
        })
        .await
    }

    async fn create_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user: &NewUser,
    ) -> StorageResult<User> {
        let row = prepare_user(account_id, user, Utc::now())?;

        self.blocking(cancel, move |db, cancel| {
            let txn = db.begin_write()?;
            {
                let accounts = txn.open_table(ACCOUNT_ROWS)?;
                if accounts.get(row.account_id.as_str())?.is_none() {
                    return Err(StorageError::not_found(
                        "account",
                        account_name(&row.account_id),
                    ));
                }
                let mut users = txn.open_table(USER_ROWS)?;
                let mut slugs = txn.open_table(USER_SLUG_INDEX)?;
                ensure_active(cancel)?;
                insert_user(&mut users, &mut slugs, &row)?;
            }
            commit_unless_cancelled(txn, cancel)?;
            Ok(row.to_model())
        })
        .await
    }

    async fn create_identity(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        parent_user_name: &str,
        identity: &NewIdentity,
    ) -> StorageResult<Identity> {
        let slug = slug_from_user_name(parent_user_name)?;
        let password_hash = self.hasher.hash_identity(identity).await?;
        let auth_method = identity.auth_method;
        let account_id = account_id.to_string();

        self.blocking(cancel, move |db, cancel| {
            let txn = db.begin_write()?;
            let created = {
                let slugs = txn.open_table(USER_SLUG_INDEX)?;
                let users = txn.open_table(USER_ROWS)?;
                let owner = find_user(&slugs, &users, &account_id, &slug)?
                    .ok_or_else(|| StorageError::not_found("user", user_name(&slug)))?;

                let row = IdentityRow::new(&owner.id, auth_method, password_hash, Utc::now());
                let mut identities = txn.open_table(IDENTITY_ROWS)?;
                let mut index = txn.open_table(USER_IDENTITY_INDEX)?;
                ensure_active(cancel)?;
                insert_identity(&mut identities, &mut index, &row)?;
                row.to_model(&owner)
            };
            commit_unless_cancelled(txn, cancel)?;
            Ok(created)
        })
        .await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.blocking(&CancellationToken::new(), |db, _| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(ACCOUNT_ROWS)?;
            Ok(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "redb"
    }
}

// =============================================================================
// Tests
// =============================================================================
