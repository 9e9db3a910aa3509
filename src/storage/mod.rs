// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Store
//!
//! Persists one [`UserRecord`] per principal: identity fields, the argon2
//! password hash, and the single refresh-token slot.
//!
//! ## Backends
//!
//! - [`InMemoryUserStore`] - process-local map, used by tests and when no
//!   `DATA_DIR` is configured
//! - [`RedbUserStore`] - embedded ACID database (`users.redb`) with unique
//!   indexes on username, email and phone number
//!
//! ## Refresh-token slot
//!
//! The slot is only ever written through [`UserStore::set_refresh_token`]
//! (unconditional overwrite, used by login/logout) and
//! [`UserStore::swap_refresh_token`] (compare-and-swap, used by refresh).
//! [`UserStore::save`] keeps whatever token is currently stored so a profile
//! update can never resurrect a rotated token.
//!
//! ## Password hash
//!
//! Likewise only [`UserStore::set_password_hash`] replaces the hash after
//! insert; [`UserStore::save`] keeps the stored one, so a profile update
//! racing a password change cannot restore the old password.

pub mod memory;
pub mod redb_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryUserStore;
pub use redb_store::RedbUserStore;

/// A principal as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Lowercased handle, unique
    pub username: String,
    /// Lowercased email address, unique
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Phone number, unique
    pub phone_number: String,
    /// Avatar URL (uploaded elsewhere)
    #[serde(default)]
    pub avatar: Option<String>,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Raw string of the last issued refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields that must be unique across principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Username,
    Email,
    PhoneNumber,
}

impl std::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityField::Username => write!(f, "username"),
            IdentityField::Email => write!(f, "email"),
            IdentityField::PhoneNumber => write!(f, "phone number"),
        }
    }
}

/// Identifier fields to match a principal against.
///
/// A record matches when **any** provided field equals the stored value.
/// Fields are compared in order username, email, phone number; the first
/// hit wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserLookup<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone_number: Option<&'a str>,
}

impl<'a> UserLookup<'a> {
    pub fn by_username(username: &'a str) -> Self {
        Self {
            username: Some(username),
            ..Self::default()
        }
    }

    pub fn by_email(email: &'a str) -> Self {
        Self {
            email: Some(email),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.phone_number.is_none()
    }
}

/// Error type for credential store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(IdentityField),

    #[error("user already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage interface consumed by the session core.
///
/// Implementations serialize writes internally; every method is a single
/// atomic step with respect to other calls on the same store.
pub trait UserStore: Send + Sync {
    /// Look up a principal by identifier.
    fn find_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>>;

    /// Look up the first principal matching any provided identifier field.
    fn find_one(&self, lookup: &UserLookup<'_>) -> StoreResult<Option<UserRecord>>;

    /// Persist a new principal.
    ///
    /// Fails with [`StoreError::Duplicate`] when the username, email or
    /// phone number is already taken.
    fn insert(&self, user: &UserRecord) -> StoreResult<()>;

    /// Update an existing principal by id.
    ///
    /// Identity fields are re-checked for uniqueness against other
    /// principals. The stored refresh token and password hash are preserved.
    fn save(&self, user: &UserRecord) -> StoreResult<()>;

    /// Replace the stored password hash.
    fn set_password_hash(&self, id: &str, password_hash: &str) -> StoreResult<()>;

    /// Overwrite (or clear, with `None`) the refresh-token slot.
    fn set_refresh_token(&self, id: &str, token: Option<&str>) -> StoreResult<()>;

    /// Replace the refresh token only if the slot still holds `expected`.
    ///
    /// Returns `Ok(false)` without writing when the slot holds anything else.
    fn swap_refresh_token(&self, id: &str, expected: &str, replacement: &str)
        -> StoreResult<bool>;

    /// Clear every stored refresh token for which `is_stale` returns true.
    ///
    /// Returns the number of cleared slots.
    fn clear_refresh_tokens(&self, is_stale: &dyn Fn(&str) -> bool) -> StoreResult<usize>;

    /// Verify the backend is reachable.
    fn health_check(&self) -> StoreResult<()>;
}

/// Return the first identity field of `candidate` already used by a
/// different principal in `existing`.
pub(crate) fn conflicting_field<'a>(
    candidate: &UserRecord,
    existing: impl IntoIterator<Item = &'a UserRecord>,
) -> Option<IdentityField> {
    for other in existing {
        if other.id == candidate.id {
            continue;
        }
        if other.username == candidate.username {
            return Some(IdentityField::Username);
        }
        if other.email == candidate.email {
            return Some(IdentityField::Email);
        }
        if other.phone_number == candidate.phone_number {
            return Some(IdentityField::PhoneNumber);
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(id: &str, username: &str) -> UserRecord {
        let now = Utc::now();
        let digits = id
            .bytes()
            .chain(username.bytes())
            .fold(7u64, |acc, b| (acc * 31 + u64::from(b)) % 1_000_000_000);
        UserRecord {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: format!("9{digits:09}"),
            avatar: None,
            password_hash: "$argon2id$placeholder".to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::user;
    use super::*;

    #[test]
    fn conflicting_field_ignores_same_id() {
        let alice = user("u-1", "alice");
        assert_eq!(conflicting_field(&alice, [&alice]), None);
    }

    #[test]
    fn conflicting_field_reports_first_clash() {
        let alice = user("u-1", "alice");
        let mut bob = user("u-2", "bob");
        bob.email = alice.email.clone();
        assert_eq!(conflicting_field(&bob, [&alice]), Some(IdentityField::Email));

        bob.username = "alice".to_string();
        assert_eq!(
            conflicting_field(&bob, [&alice]),
            Some(IdentityField::Username)
        );
    }

    #[test]
    fn lookup_helpers() {
        assert!(UserLookup::default().is_empty());
        let lookup = UserLookup::by_email("a@b.co");
        assert_eq!(lookup.email, Some("a@b.co"));
        assert!(lookup.username.is_none());
    }
}
