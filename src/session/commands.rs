// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed commands built from request bodies.
//!
//! Each request body is checked exactly once here; the session manager only
//! ever sees well-formed commands.

use super::SessionError;
use crate::models::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateAccountRequest, UpdateAvatarRequest,
};
use crate::storage::{UserLookup, UserRecord};
use crate::validation::{
    check_password, is_valid_email, is_valid_image_url, is_valid_phone, non_blank,
    normalize_identifier, EmailPolicy,
};

const INVALID_EMAIL: &str = "Please enter correct email address!";
const INVALID_PHONE: &str = "Please enter correct phone number!";
const INVALID_AVATAR: &str = "Avatar must be an http or https URL";

/// How a principal is identified on login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Username(String),
    Email(String),
    Both { username: String, email: String },
}

impl Identifier {
    pub fn lookup(&self) -> UserLookup<'_> {
        match self {
            Identifier::Username(username) => UserLookup::by_username(username),
            Identifier::Email(email) => UserLookup::by_email(email),
            Identifier::Both { username, email } => UserLookup {
                username: Some(username),
                email: Some(email),
                phone_number: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub identifier: Identifier,
    pub password: String,
}

impl LoginCommand {
    pub fn parse(req: LoginRequest, policy: EmailPolicy) -> Result<Self, SessionError> {
        let username = non_blank(req.username.as_deref()).map(normalize_identifier);
        let email = non_blank(req.email.as_deref()).map(normalize_identifier);

        let identifier = match (username, email) {
            (Some(username), Some(email)) => {
                if policy == EmailPolicy::Strict && !is_valid_email(&email) {
                    return Err(SessionError::validation(INVALID_EMAIL));
                }
                Identifier::Both { username, email }
            }
            (Some(username), None) => Identifier::Username(username),
            (None, Some(email)) => {
                if !is_valid_email(&email) {
                    return Err(SessionError::validation(INVALID_EMAIL));
                }
                Identifier::Email(email)
            }
            (None, None) => {
                return Err(SessionError::validation("username or email is required"));
            }
        };

        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SessionError::validation("Password is required"))?;

        Ok(Self {
            identifier,
            password,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

impl RegisterCommand {
    pub fn parse(req: RegisterRequest) -> Result<Self, SessionError> {
        let (
            Some(username),
            Some(first_name),
            Some(last_name),
            Some(phone_number),
            Some(email),
            Some(_),
        ) = (
            non_blank(req.username.as_deref()),
            non_blank(req.first_name.as_deref()),
            non_blank(req.last_name.as_deref()),
            non_blank(req.phone_number.as_deref()),
            non_blank(req.email.as_deref()),
            non_blank(req.password.as_deref()),
        )
        else {
            return Err(SessionError::validation("All fields are required!!"));
        };

        let email = normalize_identifier(email);
        if !is_valid_email(&email) {
            return Err(SessionError::validation(INVALID_EMAIL));
        }
        if !is_valid_phone(phone_number) {
            return Err(SessionError::validation(INVALID_PHONE));
        }
        let avatar = non_blank(req.avatar.as_deref());
        if avatar.is_some_and(|a| !is_valid_image_url(a)) {
            return Err(SessionError::validation(INVALID_AVATAR));
        }
        let password = req.password.unwrap_or_default();
        check_password(&password).map_err(SessionError::Validation)?;

        Ok(Self {
            username: normalize_identifier(username),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone_number: phone_number.to_string(),
            email,
            password,
            avatar: avatar.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChangePasswordCommand {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordCommand {
    pub fn parse(req: ChangePasswordRequest) -> Result<Self, SessionError> {
        let (Some(old_password), Some(new_password)) = (
            req.old_password.filter(|p| !p.is_empty()),
            req.new_password.filter(|p| !p.is_empty()),
        ) else {
            return Err(SessionError::validation(
                "Old password and new password are required",
            ));
        };
        check_password(&new_password).map_err(SessionError::Validation)?;

        Ok(Self {
            old_password,
            new_password,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAccountCommand {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl UpdateAccountCommand {
    pub fn parse(req: UpdateAccountRequest) -> Result<Self, SessionError> {
        let cmd = Self {
            username: non_blank(req.username.as_deref()).map(normalize_identifier),
            first_name: non_blank(req.first_name.as_deref()).map(str::to_string),
            last_name: non_blank(req.last_name.as_deref()).map(str::to_string),
            email: non_blank(req.email.as_deref()).map(normalize_identifier),
            phone_number: non_blank(req.phone_number.as_deref()).map(str::to_string),
        };

        if cmd.is_empty() {
            return Err(SessionError::validation(
                "At least one field is required to update account details",
            ));
        }
        if cmd.email.as_deref().is_some_and(|e| !is_valid_email(e)) {
            return Err(SessionError::validation(INVALID_EMAIL));
        }
        if cmd.phone_number.as_deref().is_some_and(|p| !is_valid_phone(p)) {
            return Err(SessionError::validation(INVALID_PHONE));
        }
        Ok(cmd)
    }

    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
    }

    /// Overwrite the provided fields on `user`.
    pub fn apply(self, user: &mut UserRecord) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone_number) = self.phone_number {
            user.phone_number = phone_number;
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateAvatarCommand {
    pub avatar: String,
}

impl UpdateAvatarCommand {
    pub fn parse(req: UpdateAvatarRequest) -> Result<Self, SessionError> {
        let avatar = non_blank(req.avatar.as_deref())
            .ok_or_else(|| SessionError::validation("Avatar is required!!"))?;
        if !is_valid_image_url(avatar) {
            return Err(SessionError::validation(INVALID_AVATAR));
        }
        Ok(Self {
            avatar: avatar.to_string(),
        })
    }
}
