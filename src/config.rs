// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! immutable [`AppConfig`]. Nothing reads the environment after that.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | HMAC secret for signing tokens | Required |
//! | `TOKEN_TTL_SECS` | Default token lifetime in seconds | `3600` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Unset (plain HTTP) |
//! | `SEED_USER_ID` | Identity inserted at startup | Unset |
//! | `SEED_USER_EMAIL` | Email of the seed identity | `seed@localhost` |
//! | `SEED_USER_ROLE` | Role of the seed identity (`user` or `admin`) | `admin` |
//! | `SEED_USER_PASSWORD` | Login password of the seed identity | Unset (no login) |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{Role, MAX_TOKEN_TTL};

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";
pub const SEED_USER_ID_ENV: &str = "SEED_USER_ID";
pub const SEED_USER_EMAIL_ENV: &str = "SEED_USER_EMAIL";
pub const SEED_USER_ROLE_ENV: &str = "SEED_USER_ROLE";
pub const SEED_USER_PASSWORD_ENV: &str = "SEED_USER_PASSWORD";

/// Default token lifetime (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// HMAC signing secret. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Settings shared by the token codec and the middleware.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: SigningSecret,
    pub token_ttl: Duration,
}

impl AuthSettings {
    pub fn new(secret: impl Into<Vec<u8>>, token_ttl: Duration) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if token_ttl.as_secs() == 0 || token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::InvalidValue {
                var: TOKEN_TTL_ENV,
                value: format!("{}ms", token_ttl.as_millis()),
            });
        }
        Ok(Self {
            secret: SigningSecret(secret),
            token_ttl,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Plain-text seed password. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedPassword(String);

impl SeedPassword {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SeedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedPassword(<redacted>)")
    }
}

/// Identity inserted into the in-memory store at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedIdentity {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub password: Option<SeedPassword>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
    pub tls: Option<TlsPaths>,
    pub seed: Option<SeedIdentity>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let token_ttl = match lookup(TOKEN_TTL_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: TOKEN_TTL_ENV,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL,
        };

        let host = lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: PORT_ENV,
                value: raw,
            })?,
            None => 8080,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        let tls = match (lookup(TLS_CERT_ENV), lookup(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let seed = match lookup(SEED_USER_ID_ENV).filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let role = match lookup(SEED_USER_ROLE_ENV) {
                    Some(raw) => Role::parse(&raw).ok_or(ConfigError::InvalidValue {
                        var: SEED_USER_ROLE_ENV,
                        value: raw,
                    })?,
                    None => Role::Admin,
                };
                Some(SeedIdentity {
                    id,
                    email: lookup(SEED_USER_EMAIL_ENV)
                        .unwrap_or_else(|| "seed@localhost".to_string()),
                    role,
                    password: lookup(SEED_USER_PASSWORD_ENV)
                        .filter(|p| !p.is_empty())
                        .map(SeedPassword),
                })
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            log_format,
            auth: AuthSettings::new(secret, token_ttl)?,
            tls,
            seed,
        })
    }
}
