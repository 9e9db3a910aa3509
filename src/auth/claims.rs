// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::UserProfile;

/// Claims carried by an access token.
///
/// Access tokens are verified by signature and expiry only; the identity
/// fields are a convenience for downstream services and are re-resolved
/// against the store by the request gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Principal identifier
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Principal identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Random token id; keeps two tokens minted in the same second distinct
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// The principal resolved by the request gate.
///
/// This is the type handlers receive through the `Auth` extractor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Public profile as currently stored
    pub profile: UserProfile,

    /// Access token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.profile.id
    }
}
