// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use super::extract::RequestCancellation;
use crate::{
    error::IamError,
    models::{AuthenticateRequest, AuthenticateResponse},
    state::AppState,
};

/// Exchange an account/user/password triple for a bearer token.
///
/// Every credential failure returns the same 401 body.
#[utoipa::path(
    post,
    path = "/v0/authenticate",
    request_body = AuthenticateRequest,
    tag = "Authentication",
    responses(
        (status = 200, description = "Signed bearer token", body = AuthenticateResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    cancel: RequestCancellation,
    Json(request): Json<AuthenticateRequest>,
) -> Result<Json<AuthenticateResponse>, IamError> {
    let token = state
        .service
        .authenticate(&cancel, &request.account, &request.user, &request.password)
        .await?;
    Ok(Json(AuthenticateResponse { token }))
}
