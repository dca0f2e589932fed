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
//! | `DATA_DIR` | Directory for local state | `./data` |
//! | `LEDGER_PATH` | Identifier ledger file | `$DATA_DIR/ledger.json` |
//! | `LEDGER_PERSIST_POLICY` | `fail-open` or `fail-closed` | `fail-open` |
//! | `VAULT_BASE_URL` | Vault node URL (unset: in-memory vault) | - |
//! | `VAULT_COLLECTION` | Collection records are stored in | `expenses` |
//! | `VAULT_TIMEOUT_SECS` | Vault HTTP timeout | `15` |
//! | `APP_PRIVATE_KEY` | secp256k1 application key (hex or PEM) | Required |
//! | `USER_DID` | Acting user identity tokens are addressed to | Required |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS when both are set | - |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::PersistPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the local data directory.
///
/// Holds the identifier ledger. Nothing else is stored locally; the records
/// themselves live in the vault.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LEDGER_PATH_ENV: &str = "LEDGER_PATH";
pub const LEDGER_PERSIST_POLICY_ENV: &str = "LEDGER_PERSIST_POLICY";
pub const VAULT_BASE_URL_ENV: &str = "VAULT_BASE_URL";
pub const VAULT_COLLECTION_ENV: &str = "VAULT_COLLECTION";
pub const VAULT_TIMEOUT_SECS_ENV: &str = "VAULT_TIMEOUT_SECS";
pub const APP_PRIVATE_KEY_ENV: &str = "APP_PRIVATE_KEY";
pub const USER_DID_ENV: &str = "USER_DID";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const LEDGER_FILE_NAME: &str = "ledger.json";
pub const DEFAULT_COLLECTION: &str = "expenses";
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 15;
/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Certificate and key for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub persist_policy: PersistPolicy,
    pub vault_base_url: Option<String>,
    pub collection: String,
    pub vault_timeout: Duration,
    pub app_private_key: String,
    pub user_did: String,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("ledger_path", &self.ledger_path)
            .field("persist_policy", &self.persist_policy)
            .field("vault_base_url", &self.vault_base_url)
            .field("collection", &self.collection)
            .field("vault_timeout", &self.vault_timeout)
            .field("app_private_key", &"<redacted>")
            .field("user_did", &self.user_did)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variables. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;

        let data_dir = get(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let ledger_path = get(LEDGER_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(LEDGER_FILE_NAME));
        let persist_policy = parse_or(
            get(LEDGER_PERSIST_POLICY_ENV),
            LEDGER_PERSIST_POLICY_ENV,
            PersistPolicy::default(),
        )?;

        let vault_base_url = get(VAULT_BASE_URL_ENV);
        let collection = get(VAULT_COLLECTION_ENV).unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        let timeout_secs = parse_or(
            get(VAULT_TIMEOUT_SECS_ENV),
            VAULT_TIMEOUT_SECS_ENV,
            DEFAULT_VAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: VAULT_TIMEOUT_SECS_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let app_private_key = get(APP_PRIVATE_KEY_ENV).ok_or(ConfigError::Missing(APP_PRIVATE_KEY_ENV))?;
        let user_did = get(USER_DID_ENV).ok_or(ConfigError::Missing(USER_DID_ENV))?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = parse_or(get(LOG_FORMAT_ENV), LOG_FORMAT_ENV, LogFormat::default())?;

        Ok(Self {
            host,
            port,
            data_dir,
            ledger_path,
            persist_policy,
            vault_base_url,
            collection,
            vault_timeout: Duration::from_secs(timeout_secs),
            app_private_key,
            user_did,
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                var: HOST_ENV,
                reason: format!("{e}"),
            })
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
