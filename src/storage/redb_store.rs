// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized UserRecord (JSON bytes)
//! - `username_index`: username → user id
//! - `email_index`: email → user id
//! - `phone_index`: phone number → user id
//!
//! Every mutating method runs in a single write transaction, so uniqueness
//! checks and the refresh-token compare-and-swap cannot interleave with
//! other writers.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};

use super::{IdentityField, StoreError, StoreResult, UserLookup, UserRecord, UserStore};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user id → serialized UserRecord (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const USERNAME_INDEX: TableDefinition<&str, &str> = TableDefinition::new("username_index");
const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index");
const PHONE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("phone_index");

type UsersTable<'txn> = Table<'txn, &'static str, &'static [u8]>;
type IndexTable<'txn> = Table<'txn, &'static str, &'static str>;

// =============================================================================
// RedbUserStore
// =============================================================================

pub struct RedbUserStore {
    db: Database,
}

impl RedbUserStore {
    /// Open (or create) the database at the given path.
    ///
    /// The parent directory must already exist.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(PHONE_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

fn load_user(table: &UsersTable<'_>, id: &str) -> StoreResult<Option<UserRecord>> {
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn store_user(table: &mut UsersTable<'_>, user: &UserRecord) -> StoreResult<()> {
    let json = serde_json::to_vec(user)?;
    table.insert(user.id.as_str(), json.as_slice())?;
    Ok(())
}

/// Fail if `key` is indexed to a principal other than `owner_id`.
fn ensure_free(
    index: &IndexTable<'_>,
    key: &str,
    owner_id: &str,
    field: IdentityField,
) -> StoreResult<()> {
    if let Some(existing) = index.get(key)? {
        if existing.value() != owner_id {
            return Err(StoreError::Duplicate(field));
        }
    }
    Ok(())
}

/// Move an index entry from `old` to `new` for `owner_id`.
fn reindex(index: &mut IndexTable<'_>, old: Option<&str>, new: &str, owner_id: &str) -> StoreResult<()> {
    if let Some(old) = old {
        if old != new {
            index.remove(old)?;
        }
    }
    index.insert(new, owner_id)?;
    Ok(())
}

impl UserStore for RedbUserStore {
    fn find_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_one(&self, lookup: &UserLookup<'_>) -> StoreResult<Option<UserRecord>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;

        let candidates = [
            (USERNAME_INDEX, lookup.username),
            (EMAIL_INDEX, lookup.email),
            (PHONE_INDEX, lookup.phone_number),
        ];

        for (index, key) in candidates {
            let Some(key) = key else { continue };
            let table = read_txn.open_table(index)?;
            if let Some(id) = table.get(key)? {
                let id = id.value().to_string();
                return match users.get(id.as_str())? {
                    Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                    None => Ok(None),
                };
            }
        }

        Ok(None)
    }

    fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            if users.get(user.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(user.id.clone()));
            }

            let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            let mut phones = write_txn.open_table(PHONE_INDEX)?;

            ensure_free(&usernames, &user.username, &user.id, IdentityField::Username)?;
            ensure_free(&emails, &user.email, &user.id, IdentityField::Email)?;
            ensure_free(&phones, &user.phone_number, &user.id, IdentityField::PhoneNumber)?;

            usernames.insert(user.username.as_str(), user.id.as_str())?;
            emails.insert(user.email.as_str(), user.id.as_str())?;
            phones.insert(user.phone_number.as_str(), user.id.as_str())?;
            store_user(&mut users, user)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn save(&self, user: &UserRecord) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let existing = load_user(&users, &user.id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {}", user.id)))?;

            let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            let mut phones = write_txn.open_table(PHONE_INDEX)?;

            ensure_free(&usernames, &user.username, &user.id, IdentityField::Username)?;
            ensure_free(&emails, &user.email, &user.id, IdentityField::Email)?;
            ensure_free(&phones, &user.phone_number, &user.id, IdentityField::PhoneNumber)?;

            reindex(&mut usernames, Some(&existing.username), &user.username, &user.id)?;
            reindex(&mut emails, Some(&existing.email), &user.email, &user.id)?;
            reindex(&mut phones, Some(&existing.phone_number), &user.phone_number, &user.id)?;

            let mut updated = user.clone();
            updated.refresh_token = existing.refresh_token;
            updated.password_hash = existing.password_hash;
            store_user(&mut users, &updated)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn set_password_hash(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let mut user = load_user(&users, id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;

            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
            store_user(&mut users, &user)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn set_refresh_token(&self, id: &str, token: Option<&str>) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let mut user = load_user(&users, id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;

            user.refresh_token = token.map(str::to_string);
            user.updated_at = Utc::now();
            store_user(&mut users, &user)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let swapped = {
            let mut users = write_txn.open_table(USERS)?;
            let mut user = load_user(&users, id)?
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;

            if user.refresh_token.as_deref() == Some(expected) {
                user.refresh_token = Some(replacement.to_string());
                user.updated_at = Utc::now();
                store_user(&mut users, &user)?;
                true
            } else {
                false
            }
        };

        if swapped {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(swapped)
    }

    fn clear_refresh_tokens(&self, is_stale: &dyn Fn(&str) -> bool) -> StoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let cleared = {
            let mut users = write_txn.open_table(USERS)?;

            let mut stale = Vec::new();
            for entry in users.iter()? {
                let (_, value) = entry?;
                let user: UserRecord = serde_json::from_slice(value.value())?;
                if user.refresh_token.as_deref().is_some_and(is_stale) {
                    stale.push(user);
                }
            }

            for mut user in stale.iter().cloned() {
                user.refresh_token = None;
                store_user(&mut users, &user)?;
            }
            stale.len()
        };
        write_txn.commit()?;
        Ok(cleared)
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
