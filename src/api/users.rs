// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints. The account is always the caller's token audience.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::{BearerToken, RequestCancellation};
use crate::{
    error::IamError,
    models::{CreateUserRequest, User},
    names::user_name,
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v0/users/{slug}",
    params(
        ("slug" = String, Path, description = "Account-scoped user slug")
    ),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = User),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "No such user in the token's account"),
    )
)]
pub async fn get_user(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    cancel: RequestCancellation,
) -> Result<Json<User>, IamError> {
    let user = state
        .service
        .get_user(&cancel, &token, &user_name(&slug))
        .await?;
    Ok(Json(user))
}

/// Create a non-root user in the token's account.
#[utoipa::path(
    post,
    path = "/v0/users",
    request_body = CreateUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 201, body = User),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 409, description = "Slug already taken in this account"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    cancel: RequestCancellation,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), IamError> {
    let user = state
        .service
        .create_user(&cancel, &token, &request.user)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
