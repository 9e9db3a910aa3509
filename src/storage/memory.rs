// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local credential store.
//!
//! Backs the test suite and development runs without a `DATA_DIR`. All
//! state is lost on restart.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{
    conflicting_field, StoreError, StoreResult, UserLookup, UserRecord, UserStore,
};

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, UserRecord>>> {
        self.users.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, UserRecord>>> {
        self.users.write().map_err(|_| StoreError::Poisoned)
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn find_one(&self, lookup: &UserLookup<'_>) -> StoreResult<Option<UserRecord>> {
        let users = self.read()?;

        let by_username = lookup
            .username
            .and_then(|username| users.values().find(|u| u.username == username));
        let by_email = || {
            lookup
                .email
                .and_then(|email| users.values().find(|u| u.email == email))
        };
        let by_phone = || {
            lookup
                .phone_number
                .and_then(|phone| users.values().find(|u| u.phone_number == phone))
        };

        Ok(by_username.or_else(by_email).or_else(by_phone).cloned())
    }

    fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        let mut users = self.write()?;

        if users.contains_key(&user.id) {
            return Err(StoreError::AlreadyExists(user.id.clone()));
        }
        if let Some(field) = conflicting_field(user, users.values()) {
            return Err(StoreError::Duplicate(field));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn save(&self, user: &UserRecord) -> StoreResult<()> {
        let mut users = self.write()?;

        if let Some(field) = conflicting_field(user, users.values()) {
            return Err(StoreError::Duplicate(field));
        }

        let Some(stored) = users.get_mut(&user.id) else {
            return Err(StoreError::NotFound(format!("User {}", user.id)));
        };

        let refresh_token = stored.refresh_token.take();
        let password_hash = std::mem::take(&mut stored.password_hash);
        *stored = user.clone();
        stored.refresh_token = refresh_token;
        stored.password_hash = password_hash;
        Ok(())
    }

    fn set_password_hash(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        let mut users = self.write()?;
        let Some(stored) = users.get_mut(id) else {
            return Err(StoreError::NotFound(format!("User {id}")));
        };

        stored.password_hash = password_hash.to_string();
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn set_refresh_token(&self, id: &str, token: Option<&str>) -> StoreResult<()> {
        let mut users = self.write()?;
        let Some(stored) = users.get_mut(id) else {
            return Err(StoreError::NotFound(format!("User {id}")));
        };

        stored.refresh_token = token.map(str::to_string);
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let mut users = self.write()?;
        let Some(stored) = users.get_mut(id) else {
            return Err(StoreError::NotFound(format!("User {id}")));
        };

        if stored.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }

        stored.refresh_token = Some(replacement.to_string());
        stored.updated_at = Utc::now();
        Ok(true)
    }

    fn clear_refresh_tokens(&self, is_stale: &dyn Fn(&str) -> bool) -> StoreResult<usize> {
        let mut users = self.write()?;
        let mut cleared = 0;

        for user in users.values_mut() {
            if user.refresh_token.as_deref().is_some_and(is_stale) {
                user.refresh_token = None;
                cleared += 1;
            }
        }

        Ok(cleared)
    }

    fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}
