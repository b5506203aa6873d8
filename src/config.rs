//! Process configuration, read from the environment after `.env` loading

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::models::address::WalletAddress;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub ethereum_network_url: String,
    pub carbon_credit_address: WalletAddress,
    pub chain_tx_timeout: Duration,
    pub session_ttl: Duration,
    pub nonce_ttl: Duration,
    /// None disables the synthetic metrics job
    pub metrics_interval: Option<Duration>,
    /// None disables purging of stale challenges and sessions
    pub auth_cleanup_interval: Option<Duration>,
    pub app_env: String,
    pub cors_allow_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), "0.0.0.0:3000".parse().ok())?;

        let ethereum_network_url = get("ETHEREUM_NETWORK_URL")
            .unwrap_or_else(|| "http://localhost:8545".to_string());

        let raw_address =
            get("CARBON_CREDIT_ADDRESS").ok_or(ConfigError::Missing("CARBON_CREDIT_ADDRESS"))?;
        let carbon_credit_address =
            WalletAddress::parse(&raw_address).map_err(|e| ConfigError::Invalid {
                key: "CARBON_CREDIT_ADDRESS",
                value: raw_address.clone(),
                reason: e.to_string(),
            })?;

        let chain_tx_timeout: u64 =
            parse_or("CHAIN_TX_TIMEOUT_SECS", get("CHAIN_TX_TIMEOUT_SECS"), Some(120))?;
        if chain_tx_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "CHAIN_TX_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let session_ttl_hours: u64 =
            parse_or("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), Some(168))?;
        let nonce_ttl_secs: u64 = parse_or("NONCE_TTL_SECS", get("NONCE_TTL_SECS"), Some(300))?;
        let metrics_interval_secs: u64 =
            parse_or("METRICS_INTERVAL_SECS", get("METRICS_INTERVAL_SECS"), Some(3600))?;
        let auth_cleanup_interval_secs: u64 = parse_or(
            "AUTH_CLEANUP_INTERVAL_SECS",
            get("AUTH_CLEANUP_INTERVAL_SECS"),
            Some(3600),
        )?;

        Ok(Self {
            database_url,
            bind_addr,
            ethereum_network_url,
            carbon_credit_address,
            chain_tx_timeout: Duration::from_secs(chain_tx_timeout),
            session_ttl: Duration::from_secs(session_ttl_hours * 3600),
            nonce_ttl: Duration::from_secs(nonce_ttl_secs),
            metrics_interval: (metrics_interval_secs > 0)
                .then(|| Duration::from_secs(metrics_interval_secs)),
            auth_cleanup_interval: (auth_cleanup_interval_secs > 0)
                .then(|| Duration::from_secs(auth_cleanup_interval_secs)),
            app_env: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}
