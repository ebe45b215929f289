// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted row types.
//!
//! Rows carry storage identifiers and foreign keys; models carry resource
//! names. Conversion happens here so names never get stored and ids never
//! leave the storage layer.
//!
//! ```text
//! accounts(id, create_time, update_time, delete_time, display_name)
//! users(id, account_id, slug, display_name, is_root, create_time, update_time, delete_time)
//!   unique (account_id, slug)
//! identities(id, user_id, auth_method, password_hash, create_time, update_time, delete_time)
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Account, AuthMethod, Identity, User};
use crate::names::{account_name, identity_name, new_id, user_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: String,
    pub display_name: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub delete_time: Option<DateTime<Utc>>,
}

impl AccountRow {
    pub fn new(display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            display_name: display_name.to_string(),
            create_time: now,
            update_time: now,
            delete_time: None,
        }
    }

    pub fn to_model(&self, root: &UserRow) -> Account {
        Account {
            name: account_name(&self.id),
            create_time: self.create_time,
            update_time: self.update_time,
            delete_time: self.delete_time,
            display_name: self.display_name.clone(),
            root: user_name(&root.slug),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub account_id: String,
    pub slug: String,
    pub display_name: String,
    pub is_root: bool,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub delete_time: Option<DateTime<Utc>>,
}

impl UserRow {
    pub fn new(
        account_id: &str,
        slug: &str,
        display_name: &str,
        is_root: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            account_id: account_id.to_string(),
            slug: slug.to_string(),
            display_name: display_name.to_string(),
            is_root,
            create_time: now,
            update_time: now,
            delete_time: None,
        }
    }

    pub fn to_model(&self) -> User {
        User {
            name: user_name(&self.slug),
            create_time: self.create_time,
            update_time: self.update_time,
            delete_time: self.delete_time,
            display_name: self.display_name.clone(),
            is_root: self.is_root,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRow {
    pub id: String,
    pub user_id: String,
    pub auth_method: AuthMethod,
    /// PHC-format Argon2id hash.
    pub password_hash: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub delete_time: Option<DateTime<Utc>>,
}

impl IdentityRow {
    pub fn new(
        user_id: &str,
        auth_method: AuthMethod,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            auth_method,
            password_hash,
            create_time: now,
            update_time: now,
            delete_time: None,
        }
    }

    pub fn to_model(&self, owner: &UserRow) -> Identity {
        Identity {
            name: identity_name(&user_name(&owner.slug), &self.id),
            create_time: self.create_time,
            update_time: self.update_time,
            delete_time: self.delete_time,
            auth_method: self.auth_method,
        }
    }
}

impl fmt::Debug for IdentityRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRow")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("auth_method", &self.auth_method)
            .field("password_hash", &"<redacted>")
            .field("create_time", &self.create_time)
            .finish_non_exhaustive()
    }
}

/// The three rows written together when an account is provisioned.
#[derive(Debug, Clone)]
pub struct AccountRows {
    pub account: AccountRow,
    pub root: UserRow,
    pub identity: IdentityRow,
}
