use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::AccountModel;

/// Public view of an account; never carries the password hash or refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AccountModel> for AccountResponse {
    fn from(account: &AccountModel) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            avatar: account.avatar.clone(),
            cover_image: account.cover_image.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<AccountModel> for AccountResponse {
    fn from(account: AccountModel) -> Self {
        Self::from(&account)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_response_hides_secrets() {
        let mut account = AccountModel::new(
            "alice",
            "alice@example.com",
            "Alice",
            "http://media/a.png".to_string(),
            None,
            "$argon2id$secret-hash".to_string(),
        );
        account.refresh_token = Some("refresh-token-value".to_string());

        let json = serde_json::to_string(&AccountResponse::from(&account)).unwrap();
        assert!(json.contains("\"_id\""));
        assert!(json.contains("\"fullName\":\"Alice\""));
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("refresh-token-value"));
    }

    #[test]
    fn test_update_request_missing_fields_default_to_empty() {
        let request: UpdateAccountRequest = serde_json::from_str(r#"{"fullName":"A"}"#).unwrap();
        assert_eq!(request.full_name, "A");
        assert!(request.email.is_empty());
    }
}
