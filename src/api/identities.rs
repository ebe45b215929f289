// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::{BearerToken, RequestCancellation};
use crate::{
    error::IamError,
    models::{CreateIdentityRequest, Identity},
    names::user_name,
    state::AppState,
};

/// Add a credential to a user. The response never contains password material.
#[utoipa::path(
    post,
    path = "/v0/users/{slug}/identities",
    params(
        ("slug" = String, Path, description = "Slug of the owning user")
    ),
    request_body = CreateIdentityRequest,
    tag = "Identities",
    security(("bearer" = [])),
    responses(
        (status = 201, body = Identity),
        (status = 400, description = "Unsupported auth method or empty password"),
        (status = 404, description = "Owning user does not exist"),
    )
)]
pub async fn create_identity(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    cancel: RequestCancellation,
    Json(request): Json<CreateIdentityRequest>,
) -> Result<(StatusCode, Json<Identity>), IamError> {
    let identity = state
        .service
        .create_identity(&cancel, &token, &user_name(&slug), &request.identity)
        .await?;
    Ok((StatusCode::CREATED, Json(identity)))
}
