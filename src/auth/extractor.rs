// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

use super::codec::VerificationError;
use super::cookies::ACCESS_COOKIE;
use super::{AuthError, AuthenticatedUser};
use crate::models::UserProfile;
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Takes the access token from the `accessToken` cookie, falling back to
/// `Authorization: Bearer <token>`. The token is verified by the codec and
/// the principal is re-read from the store, so a deleted user is rejected
/// even while their token is still within its lifetime.
///
/// # Example
///
/// ```rust,ignore
/// async fn current_user(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<ApiResponse<UserProfile>, ApiError> {
///     // user.profile is the stored profile
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A layer may already have resolved the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = extract_token(&parts.headers)?;

        let claims = state.codec.verify_access(&token).map_err(|e| match e {
            VerificationError::Expired => AuthError::TokenExpired,
            VerificationError::Malformed => AuthError::MalformedToken,
        })?;

        let record = state
            .store
            .find_by_id(&claims.id)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::UnknownPrincipal)?;

        let user = AuthenticatedUser {
            profile: UserProfile::from(&record),
            expires_at: claims.exp,
        };
        parts.extensions.insert(user.clone());

        Ok(Auth(user))
    }
}

/// Cookie first, then bearer header.
fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE).filter(|c| !c.value().is_empty()) {
        return Ok(cookie.value().to_string());
    }

    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::InvalidAuthHeader)
}
