// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field validation and identifier normalization.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("email pattern is valid")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9+]{1,5})?[7-9][0-9]{9}$").expect("phone pattern is valid")
});

/// When an email supplied on login is checked for well-formedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailPolicy {
    /// Validate whenever an email is present.
    #[default]
    Strict,
    /// Validate only when the email is the sole identifier.
    Lenient,
}

impl FromStr for EmailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(EmailPolicy::Strict),
            "lenient" => Ok(EmailPolicy::Lenient),
            other => Err(format!("unknown email policy: {other}")),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Optional 1-5 character prefix of digits or `+`, then a ten digit number
/// starting with 7, 8 or 9.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// An absolute `http`/`https` URL with a host, as stored for avatars.
pub fn is_valid_image_url(raw: &str) -> bool {
    match raw.parse::<url::Url>() {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Canonical form of a username or email: NFKC, trimmed, lowercased.
pub fn normalize_identifier(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_lowercase()
}

/// Returns the violated rule, if any.
pub fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}

/// `Some(trimmed)` when `value` holds anything other than whitespace.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
