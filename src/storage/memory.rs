// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.
//!
//! Used by tests and when `IAM_DB_PATH=:memory:`. State is lost on restart.
//! All rows of one operation are applied under a single write guard, after
//! validation and hashing have finished, so readers never see a partial
//! account.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{
    account_id_from_name, ensure_active, prepare_account, prepare_user, slug_from_user_name,
    AccountRow, CredentialStore, IdentityRow, ProvisionedAccount, StorageError, StorageResult,
    UserRow,
};
use crate::auth::PasswordHasher;
use crate::models::{AuthMethod, Identity, NewAccount, NewIdentity, NewUser, User};
use crate::names::{account_name, user_name};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, AccountRow>,
    users: HashMap<String, UserRow>,
    /// `(account_id, slug)` → user_id
    user_slugs: HashMap<(String, String), String>,
    identities: HashMap<String, IdentityRow>,
    /// user_id → identity ids, in creation order
    user_identities: HashMap<String, Vec<String>>,
}

impl Tables {
    fn find_user(&self, account_id: &str, slug: &str) -> Option<&UserRow> {
        self.user_slugs
            .get(&(account_id.to_string(), slug.to_string()))
            .and_then(|user_id| self.users.get(user_id))
    }

    fn check_slug_free(&self, row: &UserRow) -> StorageResult<()> {
        let key = (row.account_id.clone(), row.slug.clone());
        if self.user_slugs.contains_key(&key) {
            Err(StorageError::duplicate("user", "slug", &row.slug))
        } else {
            Ok(())
        }
    }

    fn insert_user(&mut self, row: UserRow) {
        self.user_slugs
            .insert((row.account_id.clone(), row.slug.clone()), row.id.clone());
        self.users.insert(row.id.clone(), row);
    }

    fn insert_identity(&mut self, row: IdentityRow) {
        self.user_identities
            .entry(row.user_id.clone())
            .or_default()
            .push(row.id.clone());
        self.identities.insert(row.id.clone(), row);
    }

    fn password_hashes(&self, user_id: &str) -> Vec<String> {
        self.user_identities
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.identities.get(id))
            .filter(|row| row.auth_method == AuthMethod::Password)
            .map(|row| row.password_hash.clone())
            .collect()
    }
}

/// Process-local [`CredentialStore`].
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    hasher: PasswordHasher,
}

impl InMemoryStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            hasher,
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn check_password(
        &self,
        cancel: &CancellationToken,
        account_name: &str,
        user_name: &str,
        password: &str,
    ) -> StorageResult<bool> {
        let account_id = account_id_from_name(account_name)?;
        let slug = slug_from_user_name(user_name)?;
        ensure_active(cancel)?;

        let hashes = {
            let tables = self.tables.read().await;
            tables
                .find_user(&account_id, &slug)
                .map(|user| tables.password_hashes(&user.id))
        };
        let Some(hashes) = hashes else {
            self.hasher.verify_dummy(password).await?;
            return Err(StorageError::not_found("user", user_name));
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
        ensure_active(cancel)?;
        let rows = prepare_account(&self.hasher, account, root, root_identity, Utc::now()).await?;
        let provisioned = ProvisionedAccount {
            account: rows.account.to_model(&rows.root),
            root: rows.root.to_model(),
            identity: rows.identity.to_model(&rows.root),
        };

        let mut tables = self.tables.write().await;
        ensure_active(cancel)?;
        tables
            .accounts
            .insert(rows.account.id.clone(), rows.account);
        tables.insert_user(rows.root);
        tables.insert_identity(rows.identity);

        Ok(provisioned)
    }

    async fn get_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user_name: &str,
    ) -> StorageResult<User> {
        let slug = slug_from_user_name(user_name)?;
        ensure_active(cancel)?;

        let tables = self.tables.read().await;
        tables
            .find_user(account_id, &slug)
            .map(UserRow::to_model)
            .ok_or_else(|| StorageError::not_found("user", user_name))
    }

    async fn create_user(
        &self,
        cancel: &CancellationToken,
        account_id: &str,
        user: &NewUser,
    ) -> StorageResult<User> {
        let row = prepare_user(account_id, user, Utc::now())?;
        ensure_active(cancel)?;

        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(account_id) {
            return Err(StorageError::not_found("account", account_name(account_id)));
        }
        tables.check_slug_free(&row)?;
        ensure_active(cancel)?;

        let created = row.to_model();
        tables.insert_user(row);
        Ok(created)
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
        ensure_active(cancel)?;

        let mut tables = self.tables.write().await;
        let owner = tables
            .find_user(account_id, &slug)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", user_name(&slug)))?;
        ensure_active(cancel)?;

        let row = IdentityRow::new(&owner.id, identity.auth_method, password_hash, Utc::now());
        let created = row.to_model(&owner);
        tables.insert_identity(row);
        Ok(created)
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::test_hasher;
    use crate::storage::conformance::{self, Inspect};

    fn store() -> InMemoryStore {
        InMemoryStore::new(test_hasher())
    }

    impl Inspect for InMemoryStore {
        async fn row_counts(&self) -> (usize, usize, usize) {
            let tables = self.tables.read().await;
            assert_eq!(tables.user_slugs.len(), tables.users.len());
            (
                tables.accounts.len(),
                tables.users.len(),
                tables.identities.len(),
            )
        }

        async fn stored_hashes(&self) -> Vec<String> {
            let tables = self.tables.read().await;
            tables
                .identities
                .values()
                .map(|row| row.password_hash.clone())
                .collect()
        }
    }

    #[tokio::test]
    async fn provisioning_creates_three_linked_entities() {
        conformance::provisioning_creates_three_linked_entities(store()).await;
    }

    #[tokio::test]
    async fn failed_provisioning_leaves_no_rows() {
        conformance::failed_provisioning_leaves_no_rows(store()).await;
    }

    #[tokio::test]
    async fn cancelled_provisioning_leaves_no_rows() {
        conformance::cancelled_provisioning_leaves_no_rows(store()).await;
    }

    #[tokio::test]
    async fn check_password_semantics() {
        conformance::check_password_semantics(store()).await;
    }

    #[tokio::test]
    async fn hashes_are_salted_and_opaque() {
        conformance::hashes_are_salted_and_opaque(store()).await;
    }

    #[tokio::test]
    async fn user_creation_rules() {
        conformance::user_creation_rules(store()).await;
    }

    #[tokio::test]
    async fn same_slug_in_two_accounts_is_allowed() {
        conformance::same_slug_in_two_accounts_is_allowed(store()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_slug_claims_have_one_winner() {
        conformance::concurrent_slug_claims_have_one_winner(store()).await;
    }

    #[tokio::test]
    async fn identity_creation_rules() {
        conformance::identity_creation_rules(store()).await;
    }

    #[tokio::test]
    async fn health_check_always_passes() {
        let store = store();
        store.health_check().await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
