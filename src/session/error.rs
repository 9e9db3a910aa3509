// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session and account operation errors.

use axum::http::StatusCode;

use crate::auth::codec::TokenError;
use crate::auth::password::PasswordError;
use crate::storage::{IdentityField, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Malformed or incomplete input
    #[error("{0}")]
    Validation(String),

    /// Wrong password
    #[error("Invalid user credentials")]
    Unauthorized,

    /// Missing or invalid access token, or no refresh token presented
    #[error("Unauthorized request")]
    Unauthenticated,

    /// Refresh token failed signature or expiry checks
    #[error("Invalid refresh token")]
    InvalidToken,

    /// Refresh token is well-formed but no longer the stored one
    #[error("Refresh token is expired or used")]
    TokenReuseOrExpired,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound("User does not exist".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::Unauthorized
            | SessionError::Unauthenticated
            | SessionError::InvalidToken
            | SessionError::TokenReuseOrExpired => StatusCode::UNAUTHORIZED,
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Conflict(_) => StatusCode::CONFLICT,
            SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(crate) fn duplicate_message(field: IdentityField) -> String {
    format!("This {field} has been already used.")
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => SessionError::Conflict(duplicate_message(field)),
            StoreError::AlreadyExists(_) => {
                SessionError::Conflict("User with email / username already exists!".to_string())
            }
            StoreError::NotFound(_) => SessionError::user_not_found(),
            other => SessionError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        SessionError::Internal(err.to_string())
    }
}

impl From<PasswordError> for SessionError {
    fn from(err: PasswordError) -> Self {
        SessionError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            SessionError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SessionError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SessionError::TokenReuseOrExpired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SessionError::user_not_found().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SessionError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            SessionError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicates_become_conflicts() {
        let err: SessionError = StoreError::Duplicate(IdentityField::PhoneNumber).into();
        assert_eq!(
            err,
            SessionError::Conflict("This phone number has been already used.".to_string())
        );
    }

    #[test]
    fn backend_failures_become_internal() {
        let err: SessionError = StoreError::Poisoned.into();
        assert!(matches!(err, SessionError::Internal(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
