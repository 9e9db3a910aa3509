// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures used by the REST API. All types
//! derive `Serialize` and/or `Deserialize`, and `ToSchema` for OpenAPI
//! documentation.
//!
//! ## Response Envelope
//!
//! Every response body, success or failure, is an [`ApiResponse`]:
//!
//! ```json
//! { "statusCode": 200, "data": { ... }, "message": "...", "success": true }
//! ```
//!
//! `success` is `statusCode < 400`. Errors carry `data: null`.
//!
//! ## Request Bodies
//!
//! Request fields are all optional at the JSON layer so that a missing field
//! produces a 400 envelope with a readable message instead of a bare
//! deserialization rejection. Bodies are checked once and converted into
//! typed commands (see `session::commands`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::UserRecord;

// =============================================================================
// Envelope
// =============================================================================

/// Uniform response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.as_u16() < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Empty `data` payload for operations that return nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmptyData {}

// =============================================================================
// Response Payloads
// =============================================================================

/// Public view of a principal. Never carries the password hash or the
/// refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairData {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login result: profile plus the token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Avatar URL, already uploaded to object storage
    pub avatar: Option<String>,
}

/// At least one of `username` / `email` is required.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body fallback for the refresh token; the `refreshToken` cookie wins.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// Any subset of the fields; at least one is required.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// New avatar URL for the current user.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAvatarRequest {
    /// Absolute http(s) URL of an image already uploaded to object storage
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::user;
    use axum::body::to_bytes;

    #[test]
    fn envelope_success_tracks_status() {
        assert!(ApiResponse::ok(EmptyData {}, "fine").success);
        assert!(ApiResponse::created(EmptyData {}, "made").success);
        assert!(!ApiResponse::new(StatusCode::CONFLICT, EmptyData {}, "taken").success);
    }

    #[tokio::test]
    async fn envelope_serializes_camel_case() {
        let response = ApiResponse::created(EmptyData {}, "User registered").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["data"], serde_json::json!({}));
        assert_eq!(body["message"], "User registered");
        assert_eq!(body["success"], true);
    }

    #[test]
    fn profile_hides_secrets() {
        let mut record = user("u-1", "alice");
        record.refresh_token = Some("rt".to_string());
        let profile = UserProfile::from(&record);

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["_id"], "u-1");
        assert_eq!(json["firstName"], "Test");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert!(json.get("avatar").is_none());
    }

    #[test]
    fn request_bodies_accept_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","firstName":"A","lastName":"L","phoneNumber":"9876543210","email":"a@b.co","password":"Secret#123"}"#,
        )
        .unwrap();
        assert_eq!(req.first_name.as_deref(), Some("A"));
        assert_eq!(req.phone_number.as_deref(), Some("9876543210"));
        assert!(req.avatar.is_none());

        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"oldPassword":"a","newPassword":"b"}"#).unwrap();
        assert_eq!(req.old_password.as_deref(), Some("a"));

        let req: UpdateAvatarRequest =
            serde_json::from_str(r#"{"avatar":"https://cdn.example/a.png"}"#).unwrap();
        assert_eq!(req.avatar.as_deref(), Some("https://cdn.example/a.png"));

        let req: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh_token.is_none());
    }
}
