// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token minting and verification, password hashing, session cookies and
//! the request gate.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with username/email + password
//! 2. Server answers with an access token and a refresh token, both as
//!    `HttpOnly` cookies and in the response body
//! 3. Protected routes take the access token from the `accessToken` cookie
//!    or `Authorization: Bearer <token>`
//! 4. When the access token expires the client exchanges its refresh token
//!    at `/api/v1/users/refresh-token` for a new pair
//!
//! ## Security
//!
//! - Access tokens are verified by signature and expiry only
//! - Refresh tokens must additionally equal the single token stored for the
//!   principal, and are rotated on every use
//! - Passwords are stored as argon2id hashes
//! - Verification uses zero clock-skew leeway

pub mod claims;
pub mod codec;
pub mod cookies;
pub mod error;
pub mod extractor;
pub mod password;

pub use claims::{AccessClaims, AuthenticatedUser, RefreshClaims};
pub use codec::{TokenCodec, TokenError, TokenKind, TokenSettings, VerificationError};
pub use cookies::{CookieSettings, ACCESS_COOKIE, REFRESH_COOKIE};
pub use error::AuthError;
pub use extractor::Auth;
