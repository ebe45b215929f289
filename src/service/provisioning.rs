// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account provisioning: account, root user and root password identity,
//! created as one unit.
//!
//! The store owns atomicity. This layer turns the request into drafts,
//! surfaces the first failing step as a single taxonomy error and records
//! the names that were allocated.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::IamService;
use crate::error::IamError;
use crate::models::{Account, CreateAccountRequest, NewIdentity};

impl IamService {
    /// Create an account with its root user and root password.
    ///
    /// When `request.root.name` is absent the root user is `users/root`.
    /// On error nothing has been committed.
    pub async fn create_account(
        &self,
        cancel: &CancellationToken,
        request: &CreateAccountRequest,
    ) -> Result<Account, IamError> {
        let root_identity = NewIdentity::password(request.root_password.as_str());

        let provisioned = self
            .store
            .create_account(cancel, &request.account, &request.root, &root_identity)
            .await
            .map_err(|err| {
                let err = IamError::from(err);
                if !matches!(err, IamError::Internal(_)) {
                    warn!(error_code = err.error_code(), error = %err, "Account provisioning rejected");
                }
                err
            })?;

        info!(
            account = %provisioned.account.name,
            root = %provisioned.root.name,
            identity = %provisioned.identity.name,
            backend = self.store.backend(),
            "Account provisioned"
        );
        Ok(provisioned.account)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::password::test_hasher;
    use crate::auth::token::testing::token_service;
    use crate::models::{NewAccount, NewUser};
    use crate::names::{parse_name, ACCOUNTS};
    use crate::service::testing::service;
    use crate::storage::conformance::Inspect;
    use crate::storage::InMemoryStore;

    fn request(display_name: &str, root: NewUser, password: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            account: NewAccount {
                display_name: display_name.into(),
            },
            root,
            root_password: password.into(),
        }
    }

    fn root() -> NewUser {
        NewUser {
            name: None,
            display_name: "Root".into(),
        }
    }

    #[tokio::test]
    async fn returns_account_with_root_reference() {
        let service = service();
        let account = service
            .create_account(&CancellationToken::new(), &request("Acme", root(), "pw"))
            .await
            .unwrap();

        assert!(parse_name(&account.name, ACCOUNTS).is_ok());
        assert_eq!(account.display_name, "Acme");
        assert_eq!(account.root, "users/root");
        assert_eq!(account.create_time, account.update_time);
        assert!(account.delete_time.is_none());
    }

    #[tokio::test]
    async fn rejected_request_commits_nothing() {
        let store = Arc::new(InMemoryStore::new(test_hasher()));
        let service = IamService::new(store.clone(), token_service());
        let cancel = CancellationToken::new();

        let err = service
            .create_account(&cancel, &request("Acme", root(), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::InvalidArgument(_)));

        let err = service
            .create_account(&cancel, &request("", root(), "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::InvalidArgument(_)));

        let bad_root = NewUser {
            name: Some("accounts/x/users/root".into()),
            display_name: "Root".into(),
        };
        let err = service
            .create_account(&cancel, &request("Acme", bad_root, "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, IamError::InvalidArgument(_)));

        assert_eq!(store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn cancelled_request_is_internal_and_commits_nothing() {
        let store = Arc::new(InMemoryStore::new(test_hasher()));
        let service = IamService::new(store.clone(), token_service());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .create_account(&cancel, &request("Acme", root(), "pw"))
            .await
            .unwrap_err();
        assert_eq!(err, IamError::Internal("request cancelled".into()));
        assert_eq!(store.row_counts().await, (0, 0, 0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_provisioning_allocates_distinct_accounts() {
        let store = Arc::new(InMemoryStore::new(test_hasher()));
        let service = IamService::new(store.clone(), token_service());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_account(
                            &CancellationToken::new(),
                            &request(&format!("Tenant {i}"), root(), "pw"),
                        )
                        .await
                })
            })
            .collect();

        let mut names = Vec::new();
        for task in tasks {
            names.push(task.await.unwrap().unwrap().name);
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
        assert_eq!(store.row_counts().await, (8, 8, 8));
    }
}
