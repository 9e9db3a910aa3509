// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Manager
//!
//! Login, logout and refresh, plus the account operations that mutate the
//! same principal record.
//!
//! ## Session lifecycle
//!
//! ```text
//! Anonymous --login--> Authenticated --refresh--> Refreshed --refresh--> ...
//!                            |                        |
//!                            +--------logout----------+--> LoggedOut
//! ```
//!
//! A principal has a single refresh-token slot. Login overwrites it, which
//! ends any session opened elsewhere. Refresh rotates it with a
//! compare-and-swap so two concurrent refreshes with the same token cannot
//! both succeed. Logout clears it.
//!
//! All methods are synchronous and CPU-bound (argon2); async callers should
//! run them on the blocking pool.

pub mod commands;
pub mod error;
pub mod sweeper;

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::codec::{TokenCodec, VerificationError};
use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::models::{LoginData, TokenPairData, UserProfile};
use crate::storage::{UserRecord, UserStore};
use crate::validation::EmailPolicy;

pub use commands::{
    ChangePasswordCommand, Identifier, LoginCommand, RegisterCommand, UpdateAccountCommand,
    UpdateAvatarCommand,
};
pub use error::SessionError;
pub use sweeper::RefreshTokenSweeper;

/// Short, non-reversible tag for a token, safe to log.
pub(crate) fn fingerprint(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub struct SessionManager {
    store: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    email_policy: EmailPolicy,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, codec: Arc<TokenCodec>, email_policy: EmailPolicy) -> Self {
        Self {
            store,
            codec,
            email_policy,
        }
    }

    pub fn email_policy(&self) -> EmailPolicy {
        self.email_policy
    }

    fn load(&self, user_id: &str) -> Result<UserRecord, SessionError> {
        self.store
            .find_by_id(user_id)?
            .ok_or_else(SessionError::user_not_found)
    }

    /// Create a new principal.
    pub fn register(&self, cmd: RegisterCommand) -> Result<UserProfile, SessionError> {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            username: cmd.username,
            email: cmd.email,
            first_name: cmd.first_name,
            last_name: cmd.last_name,
            phone_number: cmd.phone_number,
            avatar: cmd.avatar,
            password_hash: hash_password(&cmd.password)?,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&user)?;
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(UserProfile::from(&user))
    }

    /// Verify credentials and open a session.
    ///
    /// Overwrites any previously stored refresh token.
    pub fn login(&self, cmd: LoginCommand) -> Result<LoginData, SessionError> {
        let Some(user) = self.store.find_one(&cmd.identifier.lookup())? else {
            verify_against_dummy(&cmd.password);
            debug!("Login attempt for unknown user");
            return Err(SessionError::user_not_found());
        };

        if !verify_password(&cmd.password, &user.password_hash) {
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(SessionError::Unauthorized);
        }

        let access_token = self.codec.issue_access_token(&user)?;
        let refresh_token = self.codec.issue_refresh_token(&user.id)?;
        self.store.set_refresh_token(&user.id, Some(&refresh_token))?;

        info!(
            user_id = %user.id,
            refresh = %fingerprint(&refresh_token),
            "User logged in"
        );
        Ok(LoginData {
            user: UserProfile::from(&user),
            access_token,
            refresh_token,
        })
    }

    /// Close the principal's session. Idempotent.
    pub fn logout(&self, user_id: &str) -> Result<(), SessionError> {
        self.store.set_refresh_token(user_id, None)?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new token pair, rotating the stored
    /// refresh token.
    pub fn refresh(&self, presented: Option<&str>) -> Result<TokenPairData, SessionError> {
        // Compared byte-for-byte against the stored slot, so no trimming.
        let token = presented
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Unauthenticated)?;

        let claims = self.codec.verify_refresh(token).map_err(|e| {
            debug!(error = %e, refresh = %fingerprint(token), "Refresh token rejected");
            SessionError::InvalidToken
        })?;

        let user = self.load(&claims.id)?;
        if user.refresh_token.as_deref() != Some(token) {
            warn!(
                user_id = %user.id,
                refresh = %fingerprint(token),
                "Superseded refresh token presented"
            );
            return Err(SessionError::TokenReuseOrExpired);
        }

        let access_token = self.codec.issue_access_token(&user)?;
        let refresh_token = self.codec.issue_refresh_token(&user.id)?;

        if !self
            .store
            .swap_refresh_token(&user.id, token, &refresh_token)?
        {
            warn!(
                user_id = %user.id,
                refresh = %fingerprint(token),
                "Refresh token rotated concurrently"
            );
            return Err(SessionError::TokenReuseOrExpired);
        }

        info!(
            user_id = %user.id,
            refresh = %fingerprint(&refresh_token),
            "Session refreshed"
        );
        Ok(TokenPairData {
            access_token,
            refresh_token,
        })
    }

    pub fn current_user(&self, user_id: &str) -> Result<UserProfile, SessionError> {
        self.load(user_id).map(|user| UserProfile::from(&user))
    }

    /// Replace the password hash. The stored refresh token is kept.
    pub fn change_password(
        &self,
        user_id: &str,
        cmd: ChangePasswordCommand,
    ) -> Result<(), SessionError> {
        let user = self.load(user_id)?;

        if !verify_password(&cmd.old_password, &user.password_hash) {
            return Err(SessionError::validation("Invalid old password"));
        }

        let password_hash = hash_password(&cmd.new_password)?;
        self.store.set_password_hash(&user.id, &password_hash)?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    pub fn update_account(
        &self,
        user_id: &str,
        cmd: UpdateAccountCommand,
    ) -> Result<UserProfile, SessionError> {
        let mut user = self.load(user_id)?;
        cmd.apply(&mut user);
        user.updated_at = Utc::now();
        self.store.save(&user)?;

        info!(user_id = %user_id, "Account details updated");
        Ok(UserProfile::from(&user))
    }

    /// Point the profile at a new avatar image.
    pub fn update_avatar(
        &self,
        user_id: &str,
        cmd: UpdateAvatarCommand,
    ) -> Result<UserProfile, SessionError> {
        let mut user = self.load(user_id)?;
        user.avatar = Some(cmd.avatar);
        user.updated_at = Utc::now();
        self.store.save(&user)?;

        info!(user_id = %user_id, "Avatar updated");
        Ok(UserProfile::from(&user))
    }

    /// Clear stored refresh tokens that can no longer be redeemed.
    ///
    /// A token is cleared once it has expired, or when it no longer verifies
    /// at all (e.g. after a secret rotation).
    pub fn sweep_expired_refresh_tokens(&self) -> Result<usize, SessionError> {
        let codec = &self.codec;
        let is_stale = |token: &str| {
            matches!(
                codec.verify_refresh(token),
                Err(VerificationError::Expired | VerificationError::Malformed)
            )
        };
        Ok(self.store.clear_refresh_tokens(&is_stale)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::auth::codec::testing::codec;
    use crate::models::RegisterRequest;
    use crate::storage::InMemoryUserStore;

    pub const ALICE_PASSWORD: &str = "Secret#123";

    pub fn manager() -> (SessionManager, Arc<InMemoryUserStore>) {
        manager_with_codec(codec())
    }

    pub fn manager_with_codec(codec: TokenCodec) -> (SessionManager, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let sessions = SessionManager::new(store.clone(), Arc::new(codec), EmailPolicy::Strict);
        (sessions, store)
    }

    pub fn register_request(username: &str, phone: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            first_name: Some("First".to_string()),
            last_name: Some("Last".to_string()),
            phone_number: Some(phone.to_string()),
            email: Some(format!("{username}@example.com")),
            password: Some(ALICE_PASSWORD.to_string()),
            avatar: None,
        }
    }

    pub fn register_alice(sessions: &SessionManager) -> UserProfile {
        let cmd = RegisterCommand::parse(register_request("alice", "9876543210")).unwrap();
        sessions.register(cmd).unwrap()
    }

    pub fn login_as(username: &str, password: &str) -> LoginCommand {
        LoginCommand {
            identifier: Identifier::Username(username.to_string()),
            password: password.to_string(),
        }
    }
}
