// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # IAM Service
//!
//! The operations exposed over the API, built on a [`CredentialStore`] and a
//! [`TokenService`]:
//!
//! - [`IamService::authenticate`] (see [`authentication`])
//! - [`IamService::create_account`] (see [`provisioning`])
//! - [`IamService::get_user`], [`IamService::create_user`],
//!   [`IamService::create_identity`]: bearer-token operations scoped to the
//!   token's audience account
//!
//! Every method takes the request's [`CancellationToken`] and hands it to
//! the store.

pub mod authentication;
pub mod provisioning;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::auth::{AuthError, TokenClaims, TokenService};
use crate::error::IamError;
use crate::models::{Identity, NewIdentity, NewUser, User};
use crate::names::UserRef;
use crate::storage::CredentialStore;

/// Facade over storage and token handling. Cheap to clone.
#[derive(Clone)]
pub struct IamService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
}

impl IamService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, IamError> {
        let claims = self.tokens.verify(token)?;
        if claims.aud.is_empty() || claims.sub.is_empty() {
            return Err(AuthError::MalformedToken.into());
        }
        Ok(claims)
    }

    /// Fetch a user of the caller's account.
    pub async fn get_user(
        &self,
        cancel: &CancellationToken,
        token: &str,
        name: &str,
    ) -> Result<User, IamError> {
        let claims = self.verify_token(token)?;
        let user = scope_to_audience(&claims, name)?;
        Ok(self.store.get_user(cancel, &claims.aud, &user.name()).await?)
    }

    /// Create a non-root user in the caller's account.
    pub async fn create_user(
        &self,
        cancel: &CancellationToken,
        token: &str,
        user: &NewUser,
    ) -> Result<User, IamError> {
        let claims = self.verify_token(token)?;
        let name = user
            .name
            .as_deref()
            .ok_or_else(|| IamError::invalid_argument("user.name is required"))?;
        let scoped = scope_to_audience(&claims, name)?;

        let draft = NewUser {
            name: Some(scoped.name()),
            display_name: user.display_name.clone(),
        };
        let created = self.store.create_user(cancel, &claims.aud, &draft).await?;

        info!(
            account_id = %claims.aud,
            user = %created.name,
            created_by = %claims.sub,
            "User created"
        );
        Ok(created)
    }

    /// Add a credential to a user of the caller's account.
    pub async fn create_identity(
        &self,
        cancel: &CancellationToken,
        token: &str,
        parent: &str,
        identity: &NewIdentity,
    ) -> Result<Identity, IamError> {
        let claims = self.verify_token(token)?;
        let owner = scope_to_audience(&claims, parent)?;
        let created = self
            .store
            .create_identity(cancel, &claims.aud, &owner.name(), identity)
            .await?;

        info!(
            account_id = %claims.aud,
            identity = %created.name,
            auth_method = %created.auth_method,
            "Identity created"
        );
        Ok(created)
    }
}

/// Resolve `name` against the token's account. An explicit
/// `accounts/{id}/users/{slug}` must name the same account as `aud`.
fn scope_to_audience(claims: &TokenClaims, name: &str) -> Result<UserRef, IamError> {
    let user = UserRef::parse(name)?;
    match user.account_id.as_deref() {
        Some(account_id) if account_id != claims.aud => Err(AuthError::InvalidAudience.into()),
        _ => Ok(user),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::service;
    use super::*;
    use crate::models::{AuthMethod, CreateAccountRequest, NewAccount};

    /// Provision an account with root `alice` and return (account name, root token).
    async fn signed_in(service: &IamService) -> (String, String) {
        let cancel = CancellationToken::new();
        let account = service
            .create_account(
                &cancel,
                &CreateAccountRequest {
                    account: NewAccount {
                        display_name: "Acme".into(),
                    },
                    root: NewUser {
                        name: Some("users/alice".into()),
                        display_name: "Alice".into(),
                    },
                    root_password: "hunter2".into(),
                },
            )
            .await
            .unwrap();
        let token = service
            .authenticate(&cancel, &account.name, "users/alice", "hunter2")
            .await
            .unwrap();
        (account.name, token)
    }

    fn named(name: &str) -> NewUser {
        NewUser {
            name: Some(name.into()),
            display_name: "Someone".into(),
        }
    }

    #[tokio::test]
    async fn get_user_resolves_within_token_account() {
        let service = service();
        let cancel = CancellationToken::new();
        let (account, token) = signed_in(&service).await;

        let root = service.get_user(&cancel, &token, "users/alice").await.unwrap();
        assert!(root.is_root);

        let scoped = format!("{account}/users/alice");
        assert_eq!(service.get_user(&cancel, &token, &scoped).await.unwrap(), root);

        let err = service
            .get_user(&cancel, &token, "users/nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::NotFound(_)));
    }

    #[tokio::test]
    async fn foreign_account_scope_is_unauthenticated() {
        let service = service();
        let cancel = CancellationToken::new();
        let (_, token) = signed_in(&service).await;
        let (other_account, _) = signed_in(&service).await;

        let err = service
            .get_user(&cancel, &token, &format!("{other_account}/users/alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn bad_tokens_are_unauthenticated() {
        let service = service();
        let cancel = CancellationToken::new();

        let err = service
            .get_user(&cancel, "not-a-token", "users/alice")
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn create_user_lands_in_token_account() {
        let service = service();
        let cancel = CancellationToken::new();
        let (account, token) = signed_in(&service).await;

        let bob = service
            .create_user(&cancel, &token, &named("users/bob"))
            .await
            .unwrap();
        assert_eq!(bob.name, "users/bob");
        assert!(!bob.is_root);

        let err = service
            .create_user(&cancel, &token, &named(&format!("{account}/users/bob")))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::AlreadyExists(_)));

        let err = service
            .create_user(&cancel, &token, &NewUser::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn created_identity_can_authenticate() {
        let service = service();
        let cancel = CancellationToken::new();
        let (account, token) = signed_in(&service).await;

        service
            .create_user(&cancel, &token, &named("users/bob"))
            .await
            .unwrap();
        let identity = service
            .create_identity(&cancel, &token, "users/bob", &NewIdentity::password("pw-bob"))
            .await
            .unwrap();
        assert!(identity.name.starts_with("users/bob/identities/"));
        assert_eq!(identity.auth_method, AuthMethod::Password);

        let bob_token = service
            .authenticate(&cancel, &account, "users/bob", "pw-bob")
            .await
            .unwrap();
        let claims = service.verify_token(&bob_token).unwrap();
        assert_eq!(claims.sub, "users/bob");

        let err = service
            .create_identity(&cancel, &token, "users/nobody", &NewIdentity::password("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::NotFound(_)));

        let err = service
            .create_identity(&cancel, &token, "users/bob", &NewIdentity::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::InvalidArgument(_)));
    }
}
