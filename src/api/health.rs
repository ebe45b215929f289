// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Credential store reachability.
    pub storage: String,
    /// Storage backend label ("redb" or "memory").
    pub backend: String,
    /// Whether a signing key is loaded ("ok" or "missing").
    pub signing_key: String,
    /// Whether a verification key is loaded ("ok" or "missing").
    pub verifying_key: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn label(ok: bool, failure: &str) -> String {
    if ok { "ok" } else { failure }.to_string()
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let store = state.service.store();
    let storage_ok = match store.health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(backend = store.backend(), error = %err, "Storage health check failed");
            false
        }
    };
    let keys = state.service.tokens().keys();
    let all_ok = storage_ok && keys.can_sign() && keys.can_verify();

    let response = ReadyResponse {
        status: label(all_ok, "degraded"),
        checks: HealthChecks {
            service: "ok".to_string(),
            storage: label(storage_ok, "unavailable"),
            backend: store.backend().to_string(),
            signing_key: label(keys.can_sign(), "missing"),
            verifying_key: label(keys.can_verify(), "missing"),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler. Same checks as `/health`.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::auth::password::test_hasher;
    use crate::auth::{TokenKeys, TokenService};
    use crate::storage::InMemoryStore;

    #[tokio::test]
    async fn healthy_with_both_keys() {
        let (status, Json(body)) = health(State(AppState::default())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.backend, "memory");
    }

    #[tokio::test]
    async fn degraded_without_keys() {
        let state = AppState::new(
            Arc::new(InMemoryStore::new(test_hasher())),
            TokenService::new(TokenKeys::default(), Duration::from_secs(60)),
        );
        let (status, Json(body)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.signing_key, "missing");
        assert_eq!(body.checks.storage, "ok");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        assert_eq!(liveness().await.status, "ok");
    }
}
