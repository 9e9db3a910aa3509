// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{CookieSettings, TokenCodec};
use crate::session::SessionManager;
use crate::storage::UserStore;
use crate::validation::EmailPolicy;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<SessionManager>,
    pub cookies: CookieSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        codec: TokenCodec,
        email_policy: EmailPolicy,
        cookies: CookieSettings,
    ) -> Self {
        let codec = Arc::new(codec);
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            codec.clone(),
            email_policy,
        ));
        Self {
            store,
            codec,
            sessions,
            cookies,
        }
    }
}
