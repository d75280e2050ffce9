use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{token::TokenSigner, types::TokenPair};
use crate::account::{models::AccountModel, password, repository::AccountRepository};
use crate::config::TokenSettings;
use crate::shared::AppError;

const TOKEN_GENERATION_FAILED: &str =
    "Something went wrong while generating refresh and access token";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const REFRESH_TOKEN_USED: &str = "Refresh token is expired or used";

/// Owns the access/refresh token lifecycle: issuing, verifying, rotating
/// and revoking. Each account holds a single active refresh token; storing a
/// new one supersedes every earlier one.
pub struct SessionTokenManager {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    signer: TokenSigner,
}

impl SessionTokenManager {
    pub fn new(
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            accounts,
            signer: TokenSigner::new(settings),
        }
    }

    /// Mints a fresh token pair for the account and stores the refresh token
    #[instrument(skip(self))]
    pub async fn issue_tokens(&self, account_id: &str) -> Result<TokenPair, AppError> {
        let account = self
            .accounts
            .get_account(account_id)
            .await
            .map_err(|e| {
                warn!(account_id = %account_id, error = %e, "Failed to load account for token issue");
                AppError::Internal(TOKEN_GENERATION_FAILED.to_string())
            })?
            .ok_or_else(|| {
                warn!(account_id = %account_id, "Cannot issue tokens for missing account");
                AppError::Internal(TOKEN_GENERATION_FAILED.to_string())
            })?;

        let tokens = self.mint(&account)?;

        let stored = self
            .accounts
            .set_refresh_token(&account.id, Some(&tokens.refresh_token))
            .await
            .map_err(|e| {
                warn!(account_id = %account_id, error = %e, "Failed to store refresh token");
                AppError::Internal(TOKEN_GENERATION_FAILED.to_string())
            })?;
        if !stored {
            warn!(account_id = %account_id, "Account vanished before refresh token was stored");
            return Err(AppError::Internal(TOKEN_GENERATION_FAILED.to_string()));
        }

        info!(account_id = %account_id, "Issued access and refresh tokens");
        Ok(tokens)
    }

    /// Checks credentials against the account found by username or email
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<AccountModel, AppError> {
        let account = self
            .accounts
            .find_by_username_or_email(username_or_email, username_or_email)
            .await?
            .ok_or_else(|| {
                warn!(identifier = %username_or_email, "Login for unknown account");
                AppError::NotFound("User does not exist".to_string())
            })?;

        let matches =
            password::verify_password_blocking(password.to_string(), account.password_hash.clone())
                .await?;
        if !matches {
            warn!(account_id = %account.id, "Login with wrong password");
            return Err(AppError::Unauthorized(
                "Invalid user credentials".to_string(),
            ));
        }

        info!(account_id = %account.id, "Credentials accepted");
        Ok(account)
    }

    /// Resolves a presented access token to its account
    #[instrument(skip(self, token))]
    pub async fn verify_access_token(&self, token: &str) -> Result<AccountModel, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::Unauthorized("Unauthorized request".to_string()));
        }

        let claims = self.signer.validate_access_token(token)?;

        self.accounts.get_account(&claims.sub).await?.ok_or_else(|| {
            warn!(account_id = %claims.sub, "Access token for missing account");
            AppError::Unauthorized("Invalid access token".to_string())
        })
    }

    /// Exchanges the current refresh token for a new pair. A token that is
    /// not the account's stored one (superseded, revoked or forged) is refused,
    /// so every refresh token rotates at most once.
    #[instrument(skip(self, presented))]
    pub async fn rotate_refresh_token(&self, presented: &str) -> Result<TokenPair, AppError> {
        if presented.trim().is_empty() {
            return Err(AppError::Unauthorized("Unauthorized request".to_string()));
        }

        let claims = self.signer.validate_refresh_token(presented)?;

        let account = self
            .accounts
            .get_account(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(account_id = %claims.sub, "Refresh token for missing account");
                AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
            })?;

        if account.refresh_token.as_deref() != Some(presented) {
            warn!(account_id = %account.id, "Refresh token does not match stored token");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_USED.to_string()));
        }

        let tokens = self.mint(&account)?;

        let swapped = self
            .accounts
            .replace_refresh_token(&account.id, presented, &tokens.refresh_token)
            .await?;
        if !swapped {
            warn!(account_id = %account.id, "Refresh token was rotated concurrently");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_USED.to_string()));
        }

        info!(account_id = %account.id, "Rotated refresh token");
        Ok(tokens)
    }

    /// Clears the stored refresh token. Unknown accounts are not an error.
    #[instrument(skip(self))]
    pub async fn revoke(&self, account_id: &str) -> Result<(), AppError> {
        let cleared = self.accounts.set_refresh_token(account_id, None).await?;
        info!(account_id = %account_id, cleared, "Revoked refresh token");
        Ok(())
    }

    /// Signs both tokens before anything is written
    fn mint(&self, account: &AccountModel) -> Result<TokenPair, AppError> {
        let map_sign_error = |e: AppError| {
            warn!(account_id = %account.id, error = %e, "Token signing failed");
            AppError::Internal(TOKEN_GENERATION_FAILED.to_string())
        };

        Ok(TokenPair {
            access_token: self
                .signer
                .create_access_token(account)
                .map_err(map_sign_error)?,
            refresh_token: self
                .signer
                .create_refresh_token(&account.id)
                .map_err(map_sign_error)?,
        })
    }
}
