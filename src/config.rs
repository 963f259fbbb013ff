//! Process configuration from environment variables.
//!
//! | Key | Default |
//! |---|---|
//! | `ASPEN_ADDR` | `0.0.0.0:3000` |
//! | `DATABASE_URL` | `sqlite://aspen.db?mode=rwc` |
//! | `ADMIN_PASSWORD` | required |
//! | `TOKEN_SECRET` | random per process |
//! | `TOKEN_TTL_SECS` | `43200`, must be positive |
//!
//! `ADMIN_PASSWORD` and `TOKEN_SECRET` may also be supplied as files under
//! `/run/secrets/`.

use std::{env, fmt::Display, fs::read_to_string, net::SocketAddr, str::FromStr, time::Duration};

use rand::RngCore;
use thiserror::Error;
use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub admin_password: String,
    pub token_secret: Vec<u8>,
    pub token_ttl: Duration,
}

impl Config {
    /// Reads the process environment, falling back to secret files.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok().or_else(|| read_secret(key)))
    }

    /// Builds a config from any key lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_password = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;

        let token_secret = match lookup("TOKEN_SECRET") {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                warn!("TOKEN_SECRET not set, generating one; tokens will not survive a restart");
                let mut secret = vec![0u8; 32];
                rand::rng().fill_bytes(&mut secret);
                secret
            }
        };

        let ttl_secs: u64 = try_load(&lookup, "TOKEN_TTL_SECS", "43200")?;
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_SECS",
                reason: "must be greater than zero".to_owned(),
            });
        }

        Ok(Self {
            addr: try_load(&lookup, "ASPEN_ADDR", "0.0.0.0:3000")?,
            database_url: try_load(&lookup, "DATABASE_URL", "sqlite://aspen.db?mode=rwc")?,
            admin_password,
            token_secret,
            token_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("{SECRETS_DIR}/{secret_name}");
    read_to_string(path).ok().map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_password() {
        let config = Config::from_source(source(&[("ADMIN_PASSWORD", "hunter2")])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.database_url, "sqlite://aspen.db?mode=rwc");
        assert_eq!(config.token_ttl, Duration::from_secs(43200));
        assert_eq!(config.token_secret.len(), 32);
    }

    #[test]
    fn password_is_required() {
        let err = Config::from_source(source(&[])).err();
        assert_eq!(err, Some(ConfigError::Missing("ADMIN_PASSWORD")));
    }

    #[test]
    fn malformed_values_are_reported_by_key() {
        let err = Config::from_source(source(&[
            ("ADMIN_PASSWORD", "hunter2"),
            ("TOKEN_TTL_SECS", "soon"),
        ]))
        .err();
        assert!(matches!(err, Some(ConfigError::Invalid { key: "TOKEN_TTL_SECS", .. })));
    }

    #[test]
    fn zero_token_lifetime_is_rejected() {
        let err = Config::from_source(source(&[
            ("ADMIN_PASSWORD", "hunter2"),
            ("TOKEN_TTL_SECS", "0"),
        ]))
        .err();
        assert_eq!(
            err,
            Some(ConfigError::Invalid { key: "TOKEN_TTL_SECS", reason: "must be greater than zero".into() })
        );
    }

    #[test]
    fn explicit_secret_is_used_verbatim() {
        let config = Config::from_source(source(&[
            ("ADMIN_PASSWORD", "hunter2"),
            ("TOKEN_SECRET", "s3cret"),
            ("ASPEN_ADDR", "127.0.0.1:8080"),
        ]))
        .unwrap();
        assert_eq!(config.token_secret, b"s3cret");
        assert_eq!(config.addr.port(), 8080);
    }
}
