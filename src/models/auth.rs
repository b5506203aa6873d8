use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::sea_orm_active_enums::UserRole;
use crate::entities::users;
use crate::models::address::WalletAddress;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub wallet_address: WalletAddress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub nonce: String,
    /// Exact text the wallet must sign
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub wallet_address: WalletAddress,
    /// 65-byte personal_sign signature, hex encoded
    pub signature: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub wallet_address: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    pub company: Option<String>,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserView {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            wallet_address: user.wallet_address,
            username: user.username,
            email: user.email,
            role: user.role,
            company: user.company,
            profile_image: user.profile_image,
            is_active: user.is_active,
            last_login: user.last_login.map(|d| d.with_timezone(&Utc)),
            created_at: user.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(username) = &self.username {
            let len = username.trim().chars().count();
            if !(2..=50).contains(&len) {
                errors.push("username must be between 2 and 50 characters".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                errors.push("email must be a valid address".to_string());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `local@domain.tld` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_plausible_email("alice@example.com"));
        assert!(!is_plausible_email("alice@example"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("alice @example.com"));
    }

    #[test]
    fn test_profile_validation() {
        let request = UpdateProfileRequest {
            username: Some("a".to_string()),
            email: Some("nope".to_string()),
            company: None,
        };
        assert_eq!(request.validate().unwrap_err().len(), 2);
        assert!(UpdateProfileRequest::default().validate().is_ok());
    }

    #[test]
    fn test_nonce_request_rejects_bad_address() {
        let parsed = serde_json::from_str::<NonceRequest>(r#"{"walletAddress":"0xdead"}"#);
        assert!(parsed.is_err());
    }
}
