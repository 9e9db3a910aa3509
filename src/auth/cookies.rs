// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookies.
//!
//! Both tokens travel as `HttpOnly`, `SameSite=Lax`, `Path=/` cookies. The
//! `Secure` attribute is configurable so local development over plain HTTP
//! keeps working.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl CookieSettings {
    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .path("/")
            .same_site(SameSite::Lax)
            .build()
    }

    /// Add both session cookies to `jar`.
    pub fn set_session(&self, jar: CookieJar, access_token: &str, refresh_token: &str) -> CookieJar {
        jar.add(self.build(ACCESS_COOKIE, access_token.to_string()))
            .add(self.build(REFRESH_COOKIE, refresh_token.to_string()))
    }

    fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.build(name, String::new());
        cookie.make_removal();
        cookie
    }

    /// Expire both session cookies, whether or not the request carried them.
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal(ACCESS_COOKIE))
            .add(self.removal(REFRESH_COOKIE))
    }
}
