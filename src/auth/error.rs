// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request gate errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::models::ApiResponse;

/// Why the request gate refused a request.
///
/// Every variant except `InternalError` renders as 401 with the same public
/// message; the distinction is only visible in logs via [`error_code`].
///
/// [`error_code`]: AuthError::error_code
#[derive(Debug)]
pub enum AuthError {
    /// No access token in cookie or header
    MissingToken,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is malformed or its signature is invalid
    MalformedToken,
    /// Token has expired
    TokenExpired,
    /// Token is valid but the principal no longer exists
    UnknownPrincipal,
    /// Store failure while resolving the principal
    InternalError(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::UnknownPrincipal => "unknown_principal",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Access token is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Access token is malformed"),
            AuthError::TokenExpired => write!(f, "Access token has expired"),
            AuthError::UnknownPrincipal => write!(f, "Access token refers to an unknown user"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        debug!(error_code = self.error_code(), error = %self, "Request rejected by auth gate");

        let message = match self {
            AuthError::InternalError(_) => "Something went wrong while authenticating".to_string(),
            _ => "Unauthorized request".to_string(),
        };
        ApiResponse::new(status, None::<()>, message).into_response()
    }
}
