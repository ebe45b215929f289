// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Resource Names
//!
//! Canonical, hierarchical names are the only handle callers use to refer to
//! entities. A name is a sequence of `collection/id` pairs:
//!
//! ```text
//! accounts/{id}
//! users/{slug}
//! accounts/{id}/users/{slug}
//! users/{slug}/identities/{id}
//! ```
//!
//! Every level must carry exactly one non-empty collection segment and one
//! non-empty identifier segment. Malformed names are rejected here, before
//! anything reaches storage.

use std::fmt;

use uuid::Uuid;

/// Collection segment for accounts.
pub const ACCOUNTS: &str = "accounts";
/// Collection segment for users.
pub const USERS: &str = "users";
/// Collection segment for identities.
pub const IDENTITIES: &str = "identities";

/// Slug given to the root user when the caller does not name one.
pub const DEFAULT_ROOT_SLUG: &str = "root";

const MAX_SLUG_LEN: usize = 63;

/// Resource name parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("resource name is empty")]
    Empty,

    #[error("malformed resource name '{0}'")]
    Malformed(String),

    #[error("expected a '{expected}' resource name, got '{name}'")]
    UnexpectedCollection { expected: String, name: String },

    #[error("invalid slug '{0}': use 1-63 letters, digits, '-', '_' or '.'")]
    InvalidSlug(String),
}

/// A parsed resource name: the leaf `collection/id` pair plus the name of
/// its parent, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    parent: Option<String>,
    collection: String,
    id: String,
}

impl ResourceName {
    /// Build a name from its parts.
    pub fn new(collection: impl Into<String>, id: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            parent: parent.map(str::to_string),
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Allocate a fresh name with a random 128-bit identifier.
    pub fn generate(collection: &str, parent: Option<&str>) -> Self {
        Self::new(collection, new_id(), parent)
    }

    /// Parse `name`, requiring its leaf collection to be `expected_collection`.
    pub fn parse(name: &str, expected_collection: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }

        let segments: Vec<&str> = name.split('/').collect();
        if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty())
        {
            return Err(NameError::Malformed(name.to_string()));
        }

        let collection = segments[segments.len() - 2];
        if collection != expected_collection {
            return Err(NameError::UnexpectedCollection {
                expected: expected_collection.to_string(),
                name: name.to_string(),
            });
        }

        let parent = if segments.len() > 2 {
            Some(segments[..segments.len() - 2].join("/"))
        } else {
            None
        };

        Ok(Self {
            parent,
            collection: collection.to_string(),
            id: segments[segments.len() - 1].to_string(),
        })
    }

    /// Leaf identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Leaf collection segment.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Parent resource name, if this is a nested name.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{parent}/{}/{}", self.collection, self.id),
            None => write!(f, "{}/{}", self.collection, self.id),
        }
    }
}

/// New opaque 128-bit random identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new unique name under `collection`, optionally nested in `parent`.
pub fn generate_name(collection: &str, parent: Option<&str>) -> String {
    ResourceName::generate(collection, parent).to_string()
}

/// Extract the identifier from `name`, which must be an `expected_collection` name.
pub fn parse_name(name: &str, expected_collection: &str) -> Result<String, NameError> {
    ResourceName::parse(name, expected_collection).map(|parsed| parsed.id)
}

/// `accounts/{id}`
pub fn account_name(account_id: &str) -> String {
    format!("{ACCOUNTS}/{account_id}")
}

/// `users/{slug}`
pub fn user_name(slug: &str) -> String {
    format!("{USERS}/{slug}")
}

/// `{user_name}/identities/{id}`
pub fn identity_name(user_name: &str, identity_id: &str) -> String {
    format!("{user_name}/{IDENTITIES}/{identity_id}")
}

/// Reference to a user, optionally scoped to an explicit account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Account id when the name was given as `accounts/{id}/users/{slug}`.
    pub account_id: Option<String>,
    pub slug: String,
}

impl UserRef {
    /// Parse `users/{slug}` or `accounts/{id}/users/{slug}`.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let parsed = ResourceName::parse(name, USERS)?;
        let account_id = match parsed.parent() {
            Some(parent) => {
                let scope = ResourceName::parse(parent, ACCOUNTS)?;
                if scope.parent().is_some() {
                    return Err(NameError::Malformed(name.to_string()));
                }
                Some(scope.id)
            }
            None => None,
        };
        validate_slug(parsed.id())?;
        Ok(Self {
            account_id,
            slug: parsed.id,
        })
    }

    /// Canonical account-relative name, `users/{slug}`.
    pub fn name(&self) -> String {
        user_name(&self.slug)
    }
}

/// Check that a user slug is usable as a single name segment.
pub fn validate_slug(slug: &str) -> Result<(), NameError> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(NameError::InvalidSlug(slug.to_string()))
    }
}
