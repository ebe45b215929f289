// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use super::extract::RequestCancellation;
use crate::{
    error::IamError,
    models::{Account, CreateAccountRequest},
    state::AppState,
};

/// Provision an account with its root user and root password.
#[utoipa::path(
    post,
    path = "/v0/accounts",
    request_body = CreateAccountRequest,
    tag = "Accounts",
    responses(
        (status = 201, body = Account),
        (status = 400, description = "Missing display name, bad root name or empty password"),
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), IamError> {
    let account = state.service.create_account(&cancel, &request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}
