use serde::{Deserialize, Serialize};

use crate::account::types::AccountResponse;

/// Claims carried by a short-lived access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String, // Account id
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub jti: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Claims carried by a refresh token. `jti` keeps two tokens minted in the
/// same second distinct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Username wins over email when both are present; blank values count as absent
    pub fn identifier(&self) -> Option<&str> {
        [self.username.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[test]
    fn test_token_pair_serialization() {
        let pair = TokenPair {
            access_token: "a.b.c".to_string(),
            refresh_token: "d.e.f".to_string(),
        };

        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"accessToken":"a.b.c","refreshToken":"d.e.f"}"#);
    }

    #[test]
    fn test_login_identifier() {
        let by_username: LoginRequest =
            serde_json::from_str(r#"{"username":"alice","email":"a@x.io","password":"p"}"#)
                .unwrap();
        assert_eq!(by_username.identifier(), Some("alice"));

        let by_email: LoginRequest =
            serde_json::from_str(r#"{"username":"  ","email":"a@x.io","password":"p"}"#).unwrap();
        assert_eq!(by_email.identifier(), Some("a@x.io"));

        let neither: LoginRequest = serde_json::from_str(r#"{"password":"p"}"#).unwrap();
        assert_eq!(neither.identifier(), None);
    }
}
