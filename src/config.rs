// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `users.redb` | unset (in-memory store) |
//! | `ACCESS_TOKEN_SECRET` | HS256 secret for access tokens | Required |
//! | `ACCESS_TOKEN_EXPIRY` | Access token lifetime (`15m`, `1d`, `3600s`, `900`) | `15m` |
//! | `REFRESH_TOKEN_SECRET` | HS256 secret for refresh tokens | Required |
//! | `REFRESH_TOKEN_EXPIRY` | Refresh token lifetime | `10d` |
//! | `COOKIE_SECURE` | Set the `Secure` attribute on session cookies | `true` |
//! | `EMAIL_POLICY` | `strict` or `lenient` email validation on login | `strict` |
//! | `CORS_ORIGIN` | Allowed browser origin (credentials enabled) | unset (no CORS) |
//! | `SWEEP_INTERVAL_SECS` | Interval of the stale refresh-token sweep | `3600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset (HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::auth::codec::TokenSettings;
use crate::validation::EmailPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
///
/// When unset the server runs on the in-memory store and all accounts are
/// lost on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const ACCESS_TOKEN_EXPIRY_ENV: &str = "ACCESS_TOKEN_EXPIRY";
pub const REFRESH_TOKEN_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
pub const REFRESH_TOKEN_EXPIRY_ENV: &str = "REFRESH_TOKEN_EXPIRY";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const EMAIL_POLICY_ENV: &str = "EMAIL_POLICY";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: &str = "15m";
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: &str = "10d";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// File name of the user database inside `DATA_DIR`.
pub const USERS_DB_FILE: &str = "users.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Paths to a PEM certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub access_token: TokenSettings,
    pub refresh_token: TokenSettings,
    pub cookie_secure: bool,
    pub email_policy: EmailPolicy,
    pub cors_origin: Option<String>,
    pub sweep_interval: StdDuration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host,
            })?;

        let access_token = TokenSettings {
            secret: var(ACCESS_TOKEN_SECRET_ENV)
                .ok_or(ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV))?,
            ttl: duration_var(&var, ACCESS_TOKEN_EXPIRY_ENV, DEFAULT_ACCESS_TOKEN_EXPIRY)?,
        };
        let refresh_token = TokenSettings {
            secret: var(REFRESH_TOKEN_SECRET_ENV)
                .ok_or(ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV))?,
            ttl: duration_var(&var, REFRESH_TOKEN_EXPIRY_ENV, DEFAULT_REFRESH_TOKEN_EXPIRY)?,
        };

        let cookie_secure = match var(COOKIE_SECURE_ENV) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                name: COOKIE_SECURE_ENV,
                value: raw,
            })?,
            None => true,
        };

        let email_policy = match var(EMAIL_POLICY_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: EMAIL_POLICY_ENV,
                value: raw,
            })?,
            None => EmailPolicy::default(),
        };

        let sweep_interval = match var(SWEEP_INTERVAL_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => StdDuration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: SWEEP_INTERVAL_ENV,
                        value: raw,
                    })
                }
            },
            None => StdDuration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        };

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            data_dir: var(DATA_DIR_ENV).map(PathBuf::from),
            access_token,
            refresh_token,
            cookie_secure,
            email_policy,
            cors_origin: var(CORS_ORIGIN_ENV),
            sweep_interval,
            tls,
            log_format,
        })
    }
}

fn duration_var(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<Duration, ConfigError> {
    let raw = var(name).unwrap_or_else(|| default.to_string());
    parse_duration(&raw).ok_or(ConfigError::Invalid { name, value: raw })
}

/// Parse a lifetime such as `15m`, `1d`, `12h`, `3600s` or plain seconds.
///
/// Zero and negative values are rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: i64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }

    match unit {
        "" | "s" => Duration::try_seconds(value),
        "m" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        (ACCESS_TOKEN_SECRET_ENV, "access"),
        (REFRESH_TOKEN_SECRET_ENV, "refresh"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&SECRETS).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.access_token.ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token.ttl, Duration::days(10));
        assert!(config.cookie_secure);
        assert_eq!(config.email_policy, EmailPolicy::Strict);
        assert_eq!(config.sweep_interval, StdDuration::from_secs(3600));
        assert!(config.data_dir.is_none());
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn secrets_are_required() {
        assert_eq!(
            load(&[(REFRESH_TOKEN_SECRET_ENV, "r")]).unwrap_err(),
            ConfigError::Missing(ACCESS_TOKEN_SECRET_ENV)
        );
        assert_eq!(
            load(&[(ACCESS_TOKEN_SECRET_ENV, "a"), (REFRESH_TOKEN_SECRET_ENV, "  ")]).unwrap_err(),
            ConfigError::Missing(REFRESH_TOKEN_SECRET_ENV)
        );
    }

    #[test]
    fn overrides_apply() {
        let mut vars = SECRETS.to_vec();
        vars.extend([
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "3000"),
            (ACCESS_TOKEN_EXPIRY_ENV, "1d"),
            (COOKIE_SECURE_ENV, "false"),
            (EMAIL_POLICY_ENV, "lenient"),
            (DATA_DIR_ENV, "/var/lib/market"),
            (LOG_FORMAT_ENV, "json"),
            (CORS_ORIGIN_ENV, "http://localhost:5173"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.access_token.ttl, Duration::days(1));
        assert!(!config.cookie_secure);
        assert_eq!(config.email_policy, EmailPolicy::Lenient);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/market")));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut vars = SECRETS.to_vec();
        vars.push((PORT_ENV, "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));

        let mut vars = SECRETS.to_vec();
        vars.push((REFRESH_TOKEN_EXPIRY_ENV, "10 days"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                name: REFRESH_TOKEN_EXPIRY_ENV,
                ..
            })
        ));

        let mut vars = SECRETS.to_vec();
        vars.push((EMAIL_POLICY_ENV, "sometimes"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let mut vars = SECRETS.to_vec();
        vars.push((TLS_CERT_PATH_ENV, "/etc/cert.pem"));
        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)
        );

        vars.push((TLS_KEY_PATH_ENV, "/etc/key.pem"));
        let tls = load(&vars).unwrap().tls.unwrap();
        assert_eq!(tls.cert, PathBuf::from("/etc/cert.pem"));
        assert_eq!(tls.key, PathBuf::from("/etc/key.pem"));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("900"), Some(Duration::seconds(900)));
        assert_eq!(parse_duration("3600s"), Some(Duration::hours(1)));
        assert_eq!(parse_duration("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("12h"), Some(Duration::hours(12)));
        assert_eq!(parse_duration(" 1d "), Some(Duration::days(1)));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("5w"), None);
        assert_eq!(parse_duration(""), None);
    }
}
