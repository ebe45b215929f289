// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenService;
use crate::service::IamService;
use crate::storage::CredentialStore;

/// Shared handler state: the immutable key pair and the store handle,
/// both reached through [`IamService`].
#[derive(Clone)]
pub struct AppState {
    pub service: IamService,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService) -> Self {
        Self {
            service: IamService::new(store, tokens),
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    fn default() -> Self {
        Self {
            service: crate::service::testing::service(),
        }
    }
}
