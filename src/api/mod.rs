// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        Account, AuthMethod, AuthenticateRequest, AuthenticateResponse, CreateAccountRequest,
        CreateIdentityRequest, CreateUserRequest, Identity, NewAccount, NewIdentity, NewUser,
        User,
    },
    state::AppState,
};

pub mod accounts;
pub mod authenticate;
pub mod extract;
pub mod health;
pub mod identities;
pub mod users;

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let v0_routes = Router::new()
        .route("/authenticate", post(authenticate::authenticate))
        .route("/accounts", post(accounts::create_account))
        .route("/users", post(users::create_user))
        .route("/users/{slug}", get(users::get_user))
        .route(
            "/users/{slug}/identities",
            post(identities::create_identity),
        );

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v0", v0_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware)
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        authenticate::authenticate,
        accounts::create_account,
        users::get_user,
        users::create_user,
        identities::create_identity
    ),
    components(
        schemas(
            Account,
            User,
            Identity,
            AuthMethod,
            NewAccount,
            NewUser,
            NewIdentity,
            AuthenticateRequest,
            AuthenticateResponse,
            CreateAccountRequest,
            CreateUserRequest,
            CreateIdentityRequest,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Authentication", description = "Password sign-in"),
        (name = "Accounts", description = "Account provisioning"),
        (name = "Users", description = "Users of the caller's account"),
        (name = "Identities", description = "User credentials")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::default(), Duration::from_secs(30))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = app();
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (status, doc) = send(app(), Method::GET, "/api-doc/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/v0/authenticate"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn user_routes_require_a_bearer_token() {
        let (status, body) = send(app(), Method::GET, "/v0/users/root", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_auth_header");

        let (status, _) = send(
            app(),
            Method::POST,
            "/v0/users",
            Some(json!({ "user": { "name": "users/bob", "display_name": "Bob" } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_account_over_http() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/v0/accounts",
            Some(json!({
                "account": { "display_name": "Acme" },
                "root": { "display_name": "Root" },
                "root_password": "pw"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["root"], "users/root");
        assert!(body.get("root_password").is_none());
    }
}
