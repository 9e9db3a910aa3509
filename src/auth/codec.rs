// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token codec: mint and verify access and refresh tokens.
//!
//! Both kinds are HS256 JWTs. Each kind has its own secret and lifetime, so
//! a refresh token never verifies as an access token and vice versa.
//!
//! Verification uses zero leeway: the server only verifies tokens it minted
//! itself, so there is no foreign clock to tolerate.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::claims::{AccessClaims, RefreshClaims};
use crate::storage::UserRecord;

/// The two token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Secret and lifetime for one token kind.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Minting failures. Only reachable through misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("{0} token secret is not configured")]
    MissingSecret(TokenKind),

    #[error("failed to sign {kind} token: {source}")]
    Signing {
        kind: TokenKind,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed or its signature is invalid")]
    Malformed,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(kind: TokenKind, settings: &TokenSettings) -> Result<Self, TokenError> {
        if settings.secret.trim().is_empty() {
            return Err(TokenError::MissingSecret(kind));
        }
        let secret = settings.secret.as_bytes();
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: settings.ttl,
        })
    }
}

/// Stateless access/refresh token codec.
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(access: &TokenSettings, refresh: &TokenSettings) -> Result<Self, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            access: SigningKeys::new(TokenKind::Access, access)?,
            refresh: SigningKeys::new(TokenKind::Refresh, refresh)?,
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Lifetime of tokens of the given kind.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// Mint an access token for `user`.
    pub fn issue_access_token(&self, user: &UserRecord) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.access.ttl).timestamp(),
        };
        self.sign(TokenKind::Access, &claims)
    }

    /// Mint a refresh token for the principal `user_id`.
    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            id: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh.ttl).timestamp(),
        };
        self.sign(TokenKind::Refresh, &claims)
    }

    fn sign<T: Serialize>(&self, kind: TokenKind, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(|source| TokenError::Signing { kind, source })
    }

    /// Verify a token of the given kind and return its claims.
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<T, VerificationError> {
        decode::<T>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                _ => VerificationError::Malformed,
            })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, VerificationError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, VerificationError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn settings(secret: &str, ttl: Duration) -> TokenSettings {
        TokenSettings {
            secret: secret.to_string(),
            ttl,
        }
    }

    pub fn codec() -> TokenCodec {
        TokenCodec::new(
            &settings("access-test-secret", Duration::minutes(15)),
            &settings("refresh-test-secret", Duration::days(10)),
        )
        .unwrap()
    }

    /// Codec whose tokens are already expired when minted.
    pub fn expired_codec() -> TokenCodec {
        TokenCodec::new(
            &settings("access-test-secret", Duration::seconds(-120)),
            &settings("refresh-test-secret", Duration::seconds(-120)),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{codec, expired_codec, settings};
    use super::*;
    use crate::storage::fixtures::user;

    #[test]
    fn access_token_round_trip_carries_identity() {
        let codec = codec();
        let alice = user("u-1", "alice");
        let token = codec.issue_access_token(&alice).unwrap();

        let claims = codec.verify_access(&token).unwrap();
        assert_eq!(claims.id, "u-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, alice.email);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let codec = codec();
        let first = codec.issue_refresh_token("u-1").unwrap();
        let second = codec.issue_refresh_token("u-1").unwrap();
        assert_ne!(first, second);
        assert_eq!(codec.verify_refresh(&second).unwrap().id, "u-1");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let codec = expired_codec();
        let token = codec.issue_access_token(&user("u-1", "alice")).unwrap();
        assert_eq!(
            codec.verify_access(&token).unwrap_err(),
            VerificationError::Expired
        );

        let refresh = codec.issue_refresh_token("u-1").unwrap();
        assert_eq!(
            codec.verify_refresh(&refresh).unwrap_err(),
            VerificationError::Expired
        );
    }

    #[test]
    fn kinds_do_not_cross_verify() {
        let codec = codec();
        let access = codec.issue_access_token(&user("u-1", "alice")).unwrap();
        let refresh = codec.issue_refresh_token("u-1").unwrap();

        assert_eq!(
            codec.verify_refresh(&access).unwrap_err(),
            VerificationError::Malformed
        );
        assert_eq!(
            codec.verify_access(&refresh).unwrap_err(),
            VerificationError::Malformed
        );
    }

    #[test]
    fn tampered_and_garbage_tokens_are_malformed() {
        let codec = codec();
        let token = codec.issue_refresh_token("u-1").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        assert_eq!(
            codec.verify_refresh(&tampered).unwrap_err(),
            VerificationError::Malformed
        );
        assert_eq!(
            codec.verify_refresh("not-a-jwt").unwrap_err(),
            VerificationError::Malformed
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let ours = codec();
        let theirs = TokenCodec::new(
            &settings("someone-else", Duration::minutes(15)),
            &settings("someone-else-refresh", Duration::days(1)),
        )
        .unwrap();

        let token = theirs.issue_refresh_token("u-1").unwrap();
        assert_eq!(
            ours.verify_refresh(&token).unwrap_err(),
            VerificationError::Malformed
        );
    }

    #[test]
    fn empty_secret_is_misconfiguration() {
        let result = TokenCodec::new(
            &settings("  ", Duration::minutes(15)),
            &settings("refresh", Duration::days(1)),
        );
        assert!(matches!(
            result,
            Err(TokenError::MissingSecret(TokenKind::Access))
        ));
    }
}
