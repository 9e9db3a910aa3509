// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        ChangePasswordRequest, EmptyData, LoginData, LoginRequest, RefreshRequest,
        RegisterRequest, TokenPairData, UpdateAccountRequest, UpdateAvatarRequest, UserProfile,
    },
    state::AppState,
};

pub mod health;
pub mod users;

/// CORS for a single browser origin with credentials, so the session
/// cookies are sent cross-origin. No origin means no CORS headers at all.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        Err(_) => {
            warn!(origin, "Ignoring invalid CORS origin");
            None
        }
    }
}

pub fn router(state: AppState, cors_origin: Option<&str>) -> Router {
    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/refresh-token", post(users::refresh_token))
        .route("/change-password", patch(users::change_password))
        .route("/user", get(users::current_user))
        .route("/account-details", patch(users::update_account_details))
        .route("/avatar", patch(users::update_avatar));

    let api = Router::new()
        .nest("/api/v1/users", user_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let app = Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    match cors_layer(cors_origin) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::register,
        users::login,
        users::logout,
        users::refresh_token,
        users::change_password,
        users::current_user,
        users::update_account_details,
        users::update_avatar,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UserProfile,
            LoginData,
            TokenPairData,
            EmptyData,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            ChangePasswordRequest,
            UpdateAccountRequest,
            UpdateAvatarRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Users", description = "Registration, login and session refresh"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ALICE_PASSWORD;
    use crate::state::testing::test_state;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state(), Some("http://localhost:5173"));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<String>, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookies, body)
    }

    /// `name=value` part of the Set-Cookie header for `name`.
    fn cookie_pair(cookies: &[String], name: &str) -> String {
        cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .and_then(|c| c.split(';').next())
            .unwrap()
            .to_string()
    }

    async fn register_and_login(app: &Router) -> (Vec<String>, Value) {
        let (status, _, body) = send(
            app,
            json_request(
                "POST",
                "/api/v1/users/register",
                json!({
                    "username": "alice",
                    "firstName": "Alice",
                    "lastName": "Liddell",
                    "phoneNumber": "9876543210",
                    "email": "alice@example.com",
                    "password": ALICE_PASSWORD
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["success"], true);
        assert!(body["data"]["_id"].is_string());

        let (status, cookies, body) = send(
            app,
            json_request(
                "POST",
                "/api/v1/users/login",
                json!({ "username": "alice", "password": ALICE_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (cookies, body)
    }

    #[tokio::test]
    async fn full_session_flow_over_http() {
        let app = router(test_state(), None);
        let (cookies, login) = register_and_login(&app).await;
        assert!(login["data"]["accessToken"].is_string());
        assert!(login["data"]["user"].get("passwordHash").is_none());

        let access = cookie_pair(&cookies, "accessToken");
        let refresh1 = login["data"]["refreshToken"].as_str().unwrap().to_string();

        // Gate accepts the access cookie.
        let request = Request::builder()
            .uri("/api/v1/users/user")
            .header("cookie", &access)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");

        // Refresh with the cookie rotates the token.
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users/refresh-token")
            .header("cookie", format!("refreshToken={refresh1}"))
            .body(Body::empty())
            .unwrap();
        let (status, cookies, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let refresh2 = body["data"]["refreshToken"].as_str().unwrap().to_string();
        assert_ne!(refresh1, refresh2);
        assert_eq!(cookie_pair(&cookies, "refreshToken"), format!("refreshToken={refresh2}"));

        // Replaying the superseded token fails.
        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users/refresh-token",
                json!({ "refreshToken": refresh1 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());

        // Logout with the bearer header, then the live token is dead too.
        let access_token = body_token(&login, "accessToken");
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users/logout")
            .header("authorization", format!("Bearer {access_token}"))
            .body(Body::empty())
            .unwrap();
        let (status, cookies, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=;")));

        let (status, _, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users/refresh-token",
                json!({ "refreshToken": refresh2 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    fn body_token(body: &Value, field: &str) -> String {
        body["data"][field].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn protected_routes_require_auth() {
        let app = router(test_state(), None);
        let request = Request::builder()
            .uri("/api/v1/users/user")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["statusCode"], 401);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn avatar_update_requires_auth() {
        let app = router(test_state(), None);
        let request = Request::builder()
            .method("PATCH")
            .uri("/api/v1/users/avatar")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "avatar": "https://cdn.example/a.png" }).to_string(),
            ))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn avatar_update_over_http() {
        let app = router(test_state(), None);
        let (cookies, _) = register_and_login(&app).await;

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/v1/users/avatar")
            .header("content-type", "application/json")
            .header("cookie", cookie_pair(&cookies, "accessToken"))
            .body(Body::from(
                json!({ "avatar": "https://cdn.example/a.png" }).to_string(),
            ))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["avatar"], "https://cdn.example/a.png");
    }

    #[tokio::test]
    async fn malformed_json_renders_envelope() {
        let app = router(test_state(), None);
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
    }

    #[tokio::test]
    async fn unknown_user_login_is_404() {
        let app = router(test_state(), None);
        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users/login",
                json!({ "email": "nobody@example.com", "password": "whatever" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User does not exist");
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = router(test_state(), None);
        let request = Request::builder()
            .uri("/health/live")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn invalid_cors_origin_is_ignored() {
        assert!(cors_layer(Some("bad\norigin")).is_none());
        assert!(cors_layer(None).is_none());
        assert!(cors_layer(Some("https://market.example")).is_some());
    }
}
