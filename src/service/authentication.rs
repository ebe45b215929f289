// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password authentication.
//!
//! Unknown account, unknown user, malformed names and a wrong password all
//! produce the same `Unauthenticated` error so callers cannot enumerate
//! users. Only server faults (storage, hashing, signing) surface as
//! `Internal`.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::IamService;
use crate::error::IamError;
use crate::models::AuthMethod;
use crate::names::{account_name, parse_name, UserRef, ACCOUNTS};

const INVALID_CREDENTIALS: &str = "invalid credentials";

impl IamService {
    /// Check `password` for `user` in `account` and issue a bearer token.
    ///
    /// `account` is `accounts/{id}`; `user` is `users/{slug}` or
    /// `accounts/{id}/users/{slug}` naming the same account. The token's
    /// audience is the bare account id and its subject the canonical
    /// `users/{slug}` name.
    pub async fn authenticate(
        &self,
        cancel: &CancellationToken,
        account: &str,
        user: &str,
        password: &str,
    ) -> Result<String, IamError> {
        let Some((account_id, user_name)) = resolve_principal(account, user) else {
            warn!("Authentication rejected: malformed principal");
            return Err(IamError::unauthenticated(INVALID_CREDENTIALS));
        };

        let matched = match self
            .store
            .check_password(cancel, &account_name(&account_id), &user_name, password)
            .await
        {
            Ok(matched) => matched,
            Err(err) if err.is_not_found() || err.is_invalid_argument() => false,
            Err(err) => return Err(err.into()),
        };

        if !matched {
            warn!(account_id = %account_id, "Authentication rejected");
            return Err(IamError::unauthenticated(INVALID_CREDENTIALS));
        }

        let token = self
            .tokens
            .issue(&user_name, &account_id, AuthMethod::Password)?;
        info!(account_id = %account_id, user = %user_name, "Authenticated");
        Ok(token)
    }
}

/// `(account_id, users/{slug})`, or `None` if either name is malformed or
/// the user is scoped to a different account.
fn resolve_principal(account: &str, user: &str) -> Option<(String, String)> {
    let account_id = parse_name(account, ACCOUNTS).ok()?;
    if account_name(&account_id) != account {
        return None;
    }
    let user = UserRef::parse(user).ok()?;
    match user.account_id.as_deref() {
        Some(scope) if scope != account_id => None,
        _ => Some((account_id, user.name())),
    }
}
