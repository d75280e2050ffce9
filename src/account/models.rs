use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for the accounts table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct AccountModel {
    pub id: String, // UUID v4 as string
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>, // Single active refresh token, None after logout
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountModel {
    /// Creates a new account with a generated ID. Username and email are
    /// normalised to trimmed lowercase.
    pub fn new(
        username: &str,
        email: &str,
        full_name: &str,
        avatar: String,
        cover_image: Option<String>,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            username: normalize_identifier(username),
            email: normalize_identifier(email),
            full_name: full_name.trim().to_string(),
            avatar,
            cover_image,
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Usernames and emails are matched case-insensitively
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_model() {
        let account = AccountModel::new(
            "  Alice ",
            "Alice@Example.com",
            " Alice Liddell ",
            "http://media/a.png".to_string(),
            None,
            "hash".to_string(),
        );

        assert!(!account.id.is_empty());
        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.full_name, "Alice Liddell");
        assert!(account.refresh_token.is_none());
        assert_eq!(account.created_at, account.updated_at);
    }
}
