use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::{AccessClaims, RefreshClaims};
use crate::account::models::AccountModel;
use crate::config::TokenSettings;
use crate::shared::AppError;

/// Signs and verifies access and refresh tokens. Each kind has its own
/// secret, so a refresh token is never accepted as an access token.
#[derive(Clone)]
pub struct TokenSigner {
    settings: TokenSettings,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(settings.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(settings.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(settings.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(settings.refresh_secret.as_bytes()),
            settings,
            validation,
        }
    }

    /// Creates an access token describing the given account
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub fn create_access_token(&self, account: &AccountModel) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + self.settings.access_ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        sign(&claims, &self.access_encoding)
    }

    #[instrument(skip(self))]
    pub fn create_refresh_token(&self, account_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + self.settings.refresh_ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        sign(&claims, &self.refresh_encoding)
    }

    #[instrument(skip(self, token))]
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        verify(token, &self.access_decoding, &self.validation)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))
    }

    #[instrument(skip(self, token))]
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        verify(token, &self.refresh_decoding, &self.validation)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|e| {
        debug!(error = %e, "Failed to encode JWT token");
        AppError::Internal("Failed to sign token".to_string())
    })
}

fn verify<T: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<T, jsonwebtoken::errors::Error> {
    decode::<T>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            e
        })
}
