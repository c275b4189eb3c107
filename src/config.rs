// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and passed
//! explicitly to the components that need it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the identity database | `./data` |
//! | `APP_ENV` | `production` or `development` | `development` |
//! | `JWT_SECRET` | HMAC secret for legacy self-issued tokens | insecure dev value |
//! | `FIREBASE_PROJECT_ID` | Firebase project (token issuer/audience) | Required |
//! | `FIREBASE_JWKS_URL` | JWKS endpoint for Firebase ID tokens | Google securetoken JWKS |
//! | `JWKS_REFRESH_SECS` | Background JWKS refresh interval | `3600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const FIREBASE_PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const FIREBASE_JWKS_URL_ENV: &str = "FIREBASE_JWKS_URL";
pub const JWKS_REFRESH_SECS_ENV: &str = "JWKS_REFRESH_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Secret used when `JWT_SECRET` is unset. Never acceptable outside development.
pub const DEV_JWT_SECRET: &str = "dev_secret_change_me";

/// Google's published signing keys for Firebase ID tokens.
pub const DEFAULT_FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_JWKS_REFRESH: Duration = Duration::from_secs(3600);

/// File name of the identity database inside `DATA_DIR`.
pub const IDENTITY_DB_FILE: &str = "identities.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {key} ({reason})")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("production") | Some("prod") => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, AppEnv::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// HMAC secret for self-issued tokens.
///
/// Remembers whether it came from the built-in development default so startup
/// can flag the misconfiguration. `Debug` never prints the value.
#[derive(Clone)]
pub struct JwtSecret {
    value: String,
    is_default: bool,
}

impl JwtSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_default: false,
        }
    }

    pub fn development_default() -> Self {
        Self {
            value: DEV_JWT_SECRET.to_string(),
            is_default: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSecret")
            .field("value", &"<redacted>")
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub app_env: AppEnv,
    pub jwt_secret: JwtSecret,
    pub firebase_project_id: String,
    pub firebase_jwks_url: Url,
    pub jwks_refresh_interval: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = match lookup(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: PORT_ENV,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: HOST_ENV,
                reason: format!("{e}"),
            })?;

        let data_dir = PathBuf::from(lookup(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let app_env = AppEnv::parse(lookup(APP_ENV_ENV).as_deref());

        let jwt_secret = match lookup(JWT_SECRET_ENV) {
            Some(secret) if secret.is_empty() => {
                return Err(ConfigError::Invalid {
                    key: JWT_SECRET_ENV,
                    reason: "must not be empty".to_string(),
                })
            }
            Some(secret) => JwtSecret::new(secret),
            None => JwtSecret::development_default(),
        };

        let firebase_project_id = lookup(FIREBASE_PROJECT_ID_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(FIREBASE_PROJECT_ID_ENV))?;

        let jwks_raw = lookup(FIREBASE_JWKS_URL_ENV)
            .unwrap_or_else(|| DEFAULT_FIREBASE_JWKS_URL.to_string());
        let firebase_jwks_url = Url::parse(&jwks_raw).map_err(|e| ConfigError::Invalid {
            key: FIREBASE_JWKS_URL_ENV,
            reason: format!("{e}"),
        })?;
        if firebase_jwks_url.scheme() != "https" {
            return Err(ConfigError::Invalid {
                key: FIREBASE_JWKS_URL_ENV,
                reason: "JWKS must be fetched over https".to_string(),
            });
        }

        let jwks_refresh_interval = match lookup(JWKS_REFRESH_SECS_ENV) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: JWKS_REFRESH_SECS_ENV,
                    reason: format!("{e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: JWKS_REFRESH_SECS_ENV,
                        reason: "must be positive".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_JWKS_REFRESH,
        };

        let log_format = LogFormat::parse(lookup(LOG_FORMAT_ENV).as_deref());

        Ok(Self {
            addr,
            data_dir,
            app_env,
            jwt_secret,
            firebase_project_id,
            firebase_jwks_url,
            jwks_refresh_interval,
            log_format,
        })
    }

    /// Path of the identity database file.
    pub fn identity_db_path(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_DB_FILE)
    }

    /// Log configuration problems that are tolerated but unsafe.
    pub fn warn_insecure_defaults(&self) {
        if !self.jwt_secret.is_default() {
            return;
        }
        if self.app_env.is_production() {
            tracing::error!(
                env = JWT_SECRET_ENV,
                "JWT_SECRET is not set in production; legacy tokens are verified with the public development secret"
            );
        } else {
            tracing::warn!(
                env = JWT_SECRET_ENV,
                "JWT_SECRET is not set; using the insecure development secret"
            );
        }
    }
}
