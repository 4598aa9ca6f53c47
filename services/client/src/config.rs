//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use elearn_core::ExpiryPolicy;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// A pre-verified identity used in place of the platform sign-in SDK.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub payment_timeout: Duration,
    pub payment_currency: String,
    pub expiry_policy: ExpiryPolicy,
    pub show_inactive_categories: bool,
    pub dev_identity: Option<DevIdentity>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let api_base_url = lookup("ELEARN_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("ELEARN_API_BASE_URL".to_string()))?;
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "ELEARN_API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }
        let api_base_url = api_base_url.trim_end_matches('/').to_string();

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout = parse_secs(&lookup, "ELEARN_REQUEST_TIMEOUT_SECS", 30)?;

        // --- Purchases ---
        let payment_timeout = parse_secs(&lookup, "ELEARN_PAYMENT_TIMEOUT_SECS", 600)?;
        let payment_currency = lookup("ELEARN_PAYMENT_CURRENCY")
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "INR".to_string());

        let expiry_policy = match lookup("ELEARN_EXPIRY_POLICY")
            .map(|p| p.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("informational") => ExpiryPolicy::Informational,
            Some("enforced") => ExpiryPolicy::Enforced,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "ELEARN_EXPIRY_POLICY".to_string(),
                    format!("'{}' is not one of informational, enforced", other),
                ))
            }
        };

        // --- Catalog ---
        let show_inactive_categories = match lookup("ELEARN_SHOW_INACTIVE_CATEGORIES") {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "ELEARN_SHOW_INACTIVE_CATEGORIES".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
        };

        // --- Development identity (optional) ---
        let dev_identity = lookup("ELEARN_DEV_UID")
            .filter(|uid| !uid.trim().is_empty())
            .map(|uid| DevIdentity {
                uid,
                email: lookup("ELEARN_DEV_EMAIL"),
                display_name: lookup("ELEARN_DEV_NAME"),
            });

        Ok(Self {
            api_base_url,
            log_level,
            request_timeout,
            payment_timeout,
            payment_currency,
            expiry_policy,
            show_inactive_categories,
            dev_identity,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("'{}' is not a positive number of seconds", raw),
            )),
        },
    }
}
