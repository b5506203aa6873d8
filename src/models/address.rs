//! Wallet address boundary type
//!
//! Addresses arrive in any case (EIP-55 checksummed or not) and are stored in
//! canonical lowercase form. Anything deeper than the API layer takes a
//! `WalletAddress` and never re-validates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid wallet address '{0}': expected 0x followed by 40 hex characters")]
pub struct InvalidAddress(pub String);

/// Canonical (lowercase, 42 char) Ethereum address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, InvalidAddress> {
        let trimmed = raw.trim();
        let has_prefix = trimmed.starts_with("0x") || trimmed.starts_with("0X");
        if !has_prefix
            || trimmed.len() != 42
            || !trimmed[2..].chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", trimmed[2..].to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd` form for log lines and display names
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[38..])
    }
}

/// Strict check for the stored form: lowercase, 0x-prefixed, 42 chars.
pub fn is_valid_wallet_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases_checksummed_input() {
        let addr = WalletAddress::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        assert_eq!(addr.as_str(), "0x52908400098527886e0f7030069857d2e4169ee7");
        assert!(is_valid_wallet_address(addr.as_str()));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(WalletAddress::parse("0x1234").is_err());
        assert!(WalletAddress::parse("52908400098527886e0f7030069857d2e4169ee7aa").is_err());
        assert!(WalletAddress::parse("0xZZ908400098527886e0f7030069857d2e4169ee7").is_err());
    }

    #[test]
    fn test_short_form() {
        let addr = WalletAddress::parse("0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
        assert_eq!(addr.short(), "0x5290...9ee7");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<WalletAddress, _> =
            serde_json::from_str("\"0x52908400098527886e0f7030069857d2e4169ee7\"");
        assert!(ok.is_ok());
        let bad: Result<WalletAddress, _> = serde_json::from_str("\"not-an-address\"");
        assert!(bad.is_err());
    }
}
