// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Artisan Market - Account & Session Server
//!
//! User registration, login, logout and refresh-token rotation for the
//! artisan marketplace backend.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, password hashing, cookies and the request gate
//! - `session` - Session manager and account operations
//! - `storage` - Credential store (in-memory or redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod validation;
