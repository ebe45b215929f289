// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variables are read once at startup into [`Config`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `IAM_DB_PATH` | redb database file, or `:memory:` for the in-memory store | `/data/iam.redb` |
//! | `IAM_TOKEN_SIGN_KEY` | PEM RSA private key (PKCS#1 or PKCS#8) | unset (issuing fails) |
//! | `IAM_TOKEN_VERIFY_KEY` | PEM RSA public key (SPKI or PKCS#1) | unset (verifying fails) |
//! | `IAM_TOKEN_EXPIRATION_SECS` | Token lifetime in seconds | `86400` |
//! | `IAM_HASH_CONCURRENCY` | Max simultaneous password hash/verify operations | CPU count |
//! | `IAM_REQUEST_TIMEOUT_SECS` | Per-request deadline | `30` |
//! | `IAM_HOST` | Server bind address | `0.0.0.0` |
//! | `IAM_PORT` | Server bind port | `4000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::password::default_concurrency;
use crate::auth::token::{KeyError, DEFAULT_EXPIRATION};
use crate::auth::TokenKeys;

pub const DB_PATH_ENV: &str = "IAM_DB_PATH";
pub const TOKEN_SIGN_KEY_ENV: &str = "IAM_TOKEN_SIGN_KEY";
pub const TOKEN_VERIFY_KEY_ENV: &str = "IAM_TOKEN_VERIFY_KEY";
pub const TOKEN_EXPIRATION_ENV: &str = "IAM_TOKEN_EXPIRATION_SECS";
pub const HASH_CONCURRENCY_ENV: &str = "IAM_HASH_CONCURRENCY";
pub const REQUEST_TIMEOUT_ENV: &str = "IAM_REQUEST_TIMEOUT_SECS";
pub const HOST_ENV: &str = "IAM_HOST";
pub const PORT_ENV: &str = "IAM_PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Value of `IAM_DB_PATH` selecting the in-memory store.
pub const IN_MEMORY_DB: &str = ":memory:";

pub const DEFAULT_DB_PATH: &str = "/data/iam.redb";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{var}: {source}")]
    Key {
        var: &'static str,
        #[source]
        source: KeyError,
    },
}

/// Where credentials are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Startup configuration.
#[derive(Clone)]
pub struct Config {
    pub storage: StorageLocation,
    pub sign_key_pem: Option<String>,
    pub verify_key_pem: Option<String>,
    pub token_expiration: Duration,
    pub hash_concurrency: usize,
    pub request_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let storage = match get(DB_PATH_ENV) {
            Some(path) if path == IN_MEMORY_DB => StorageLocation::Memory,
            Some(path) => StorageLocation::File(PathBuf::from(path)),
            None => StorageLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
        };

        let token_expiration = match get(TOKEN_EXPIRATION_ENV) {
            Some(value) => Duration::from_secs(parse_positive(TOKEN_EXPIRATION_ENV, &value)?),
            None => DEFAULT_EXPIRATION,
        };
        let hash_concurrency = match get(HASH_CONCURRENCY_ENV) {
            Some(value) => parse_positive(HASH_CONCURRENCY_ENV, &value)? as usize,
            None => default_concurrency(),
        };
        let request_timeout = match get(REQUEST_TIMEOUT_ENV) {
            Some(value) => Duration::from_secs(parse_positive(REQUEST_TIMEOUT_ENV, &value)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let port = match get(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    expected: "'json' or 'pretty'",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            storage,
            sign_key_pem: get(TOKEN_SIGN_KEY_ENV),
            verify_key_pem: get(TOKEN_VERIFY_KEY_ENV),
            token_expiration,
            hash_concurrency,
            request_timeout,
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_format,
        })
    }

    /// Parse the configured PEM keys. Missing keys are allowed.
    pub fn token_keys(&self) -> Result<TokenKeys, ConfigError> {
        let sign = self.sign_key_pem.as_deref().map(str::as_bytes);
        let verify = self.verify_key_pem.as_deref().map(str::as_bytes);

        TokenKeys::default()
            .with_signing(sign)
            .map_err(|source| ConfigError::Key {
                var: TOKEN_SIGN_KEY_ENV,
                source,
            })?
            .with_verifying(verify)
            .map_err(|source| ConfigError::Key {
                var: TOKEN_VERIFY_KEY_ENV,
                source,
            })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = format!("{}:{}", self.host, self.port);
        value.parse().map_err(|_| ConfigError::Invalid {
            var: HOST_ENV,
            expected: "an IP address",
            value,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("storage", &self.storage)
            .field("sign_key", &self.sign_key_pem.as_ref().map(|_| "<set>"))
            .field("verify_key", &self.verify_key_pem.as_ref().map(|_| "<set>"))
            .field("token_expiration", &self.token_expiration)
            .field("hash_concurrency", &self.hash_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a positive integer",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SIGNING_PEM: &str = include_str!("../tests/fixtures/signing_key.pem");
    const VERIFY_PEM: &str = include_str!("../tests/fixtures/verify_key.pem");

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(
            config.storage,
            StorageLocation::File(PathBuf::from(DEFAULT_DB_PATH))
        );
        assert_eq!(config.token_expiration, Duration::from_secs(86_400));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.hash_concurrency >= 1);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:4000");

        let keys = config.token_keys().unwrap();
        assert!(!keys.can_sign());
        assert!(!keys.can_verify());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            (DB_PATH_ENV, IN_MEMORY_DB),
            (TOKEN_EXPIRATION_ENV, "600"),
            (HASH_CONCURRENCY_ENV, "3"),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();

        assert_eq!(config.storage, StorageLocation::Memory);
        assert_eq!(config.token_expiration, Duration::from_secs(600));
        assert_eq!(config.hash_concurrency, 3);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(config(&[(TOKEN_EXPIRATION_ENV, "soon")]).is_err());
        assert!(config(&[(HASH_CONCURRENCY_ENV, "0")]).is_err());
        assert!(config(&[(PORT_ENV, "70000")]).is_err());
        assert!(config(&[(LOG_FORMAT_ENV, "xml")]).is_err());
    }

    #[test]
    fn loads_rsa_keys() {
        let config = config(&[
            (TOKEN_SIGN_KEY_ENV, SIGNING_PEM),
            (TOKEN_VERIFY_KEY_ENV, VERIFY_PEM),
        ])
        .unwrap();
        let keys = config.token_keys().unwrap();
        assert!(keys.can_sign());
        assert!(keys.can_verify());
        assert!(!format!("{config:?}").contains("PRIVATE"));
    }

    #[test]
    fn swapped_keys_name_the_variable() {
        let config = config(&[(TOKEN_VERIFY_KEY_ENV, SIGNING_PEM)]).unwrap();
        let err = config.token_keys().err().unwrap();
        let message = err.to_string();
        assert!(message.starts_with(TOKEN_VERIFY_KEY_ENV));
        assert!(message.contains("verify key must be RSA"));
    }

    #[test]
    fn bad_sign_key_names_its_variable_next_to_a_good_verify_key() {
        let config = config(&[
            (TOKEN_SIGN_KEY_ENV, VERIFY_PEM),
            (TOKEN_VERIFY_KEY_ENV, VERIFY_PEM),
        ])
        .unwrap();
        let message = config.token_keys().err().unwrap().to_string();
        assert!(message.starts_with(TOKEN_SIGN_KEY_ENV));
        assert!(message.contains("sign key must be RSA"));
    }

    #[test]
    fn verify_only_keys_load() {
        let config = config(&[(TOKEN_VERIFY_KEY_ENV, VERIFY_PEM)]).unwrap();
        let keys = config.token_keys().unwrap();
        assert!(!keys.can_sign());
        assert!(keys.can_verify());
    }
}
