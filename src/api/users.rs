// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User account and session endpoints.
//!
//! ## Endpoints
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/api/v1/users/register` | - |
//! | POST | `/api/v1/users/login` | - |
//! | POST | `/api/v1/users/logout` | Auth |
//! | POST | `/api/v1/users/refresh-token` | - |
//! | PATCH | `/api/v1/users/change-password` | Auth |
//! | GET | `/api/v1/users/user` | Auth |
//! | PATCH | `/api/v1/users/account-details` | Auth |
//! | PATCH | `/api/v1/users/avatar` | Auth |

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{Auth, REFRESH_COOKIE};
use crate::error::ApiError;
use crate::models::{
    ApiResponse, ChangePasswordRequest, EmptyData, LoginData, LoginRequest, RefreshRequest,
    RegisterRequest, TokenPairData, UpdateAccountRequest, UpdateAvatarRequest, UserProfile,
};
use crate::session::{
    ChangePasswordCommand, LoginCommand, RegisterCommand, SessionError, UpdateAccountCommand,
    UpdateAvatarCommand,
};
use crate::state::AppState;

/// Unwrap a JSON body, rendering rejections as a 400 envelope.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Run a session operation on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| SessionError::Internal(format!("session task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Username, email or phone number already used")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let cmd = RegisterCommand::parse(json_body(payload)?)?;
    let sessions = state.sessions.clone();
    let profile = blocking(move || sessions.register(cmd)).await?;

    Ok(ApiResponse::created(profile, "User registered successfully"))
}

/// Log in with username and/or email plus password.
///
/// Sets the `accessToken` and `refreshToken` cookies and returns both
/// tokens in the body.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginData>),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "User does not exist")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<LoginData>), ApiError> {
    let cmd = LoginCommand::parse(json_body(payload)?, state.sessions.email_policy())?;
    let sessions = state.sessions.clone();
    let data = blocking(move || sessions.login(cmd)).await?;

    let jar = state
        .cookies
        .set_session(jar, &data.access_token, &data.refresh_token);
    Ok((jar, ApiResponse::ok(data, "User logged in successfully")))
}

/// Log out: clear the stored refresh token and the session cookies.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<EmptyData>),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
pub async fn logout(
    Auth(user): Auth,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<EmptyData>), ApiError> {
    let sessions = state.sessions.clone();
    let user_id = user.user_id().to_string();
    blocking(move || sessions.logout(&user_id)).await?;

    let jar = state.cookies.clear_session(jar);
    Ok((jar, ApiResponse::ok(EmptyData {}, "User logged out successfully")))
}

/// Exchange a refresh token for a new token pair.
///
/// The token is read from the `refreshToken` cookie, falling back to the
/// `refreshToken` body field.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    tag = "Users",
    request_body(content = RefreshRequest, description = "Optional when the refreshToken cookie is sent"),
    responses(
        (status = 200, description = "Tokens rotated", body = ApiResponse<TokenPairData>),
        (status = 401, description = "Missing, invalid, expired or superseded refresh token"),
        (status = 404, description = "User does not exist")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<TokenPairData>), ApiError> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| payload.ok().and_then(|Json(body)| body.refresh_token));

    let sessions = state.sessions.clone();
    let pair = blocking(move || sessions.refresh(presented.as_deref())).await?;

    let jar = state
        .cookies
        .set_session(jar, &pair.access_token, &pair.refresh_token);
    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

/// Change the current user's password.
#[utoipa::path(
    patch,
    path = "/api/v1/users/change-password",
    tag = "Users",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<EmptyData>),
        (status = 400, description = "Invalid old password or weak new password"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
pub async fn change_password(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<EmptyData>, ApiError> {
    let cmd = ChangePasswordCommand::parse(json_body(payload)?)?;
    let sessions = state.sessions.clone();
    let user_id = user.user_id().to_string();
    blocking(move || sessions.change_password(&user_id, cmd)).await?;

    Ok(ApiResponse::ok(EmptyData {}, "Password changed successfully"))
}

/// Get the current user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/user",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
pub async fn current_user(Auth(user): Auth) -> ApiResponse<UserProfile> {
    ApiResponse::ok(user.profile, "User fetched successfully")
}

/// Update any of the current user's account details.
#[utoipa::path(
    patch,
    path = "/api/v1/users/account-details",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "No fields or invalid fields"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 409, description = "Username, email or phone number already used")
    )
)]
pub async fn update_account_details(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let cmd = UpdateAccountCommand::parse(json_body(payload)?)?;
    let sessions = state.sessions.clone();
    let user_id = user.user_id().to_string();
    let profile = blocking(move || sessions.update_account(&user_id, cmd)).await?;

    Ok(ApiResponse::ok(profile, "Account details updated successfully"))
}

/// Point the current user's avatar at an already uploaded image.
#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateAvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Missing or non-http(s) avatar URL"),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
pub async fn update_avatar(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<UpdateAvatarRequest>, JsonRejection>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let cmd = UpdateAvatarCommand::parse(json_body(payload)?)?;
    let sessions = state.sessions.clone();
    let user_id = user.user_id().to_string();
    let profile = blocking(move || sessions.update_avatar(&user_id, cmd)).await?;

    Ok(ApiResponse::ok(profile, "Avatar image updated successfully"))
}
