use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{normalize_identifier, AccountModel};
use crate::shared::AppError;

const DUPLICATE_ACCOUNT: &str = "User with email or username already exists";

/// Trait for account store operations
///
/// Every mutation after creation writes only the columns it owns, atomically
/// per account, so concurrent updates of different fields never overwrite
/// each other. Writes to a missing account fail with `NotFound`.
#[async_trait]
pub trait AccountRepository {
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError>;
    async fn get_account(&self, account_id: &str) -> Result<Option<AccountModel>, AppError>;
    /// Username matches win over email matches
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountModel>, AppError>;

    /// Sets full name and email. Fails with `Conflict` if the email belongs to another account.
    async fn update_details(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<AccountModel, AppError>;
    async fn set_password_hash(&self, account_id: &str, password_hash: &str)
        -> Result<(), AppError>;
    async fn set_avatar(&self, account_id: &str, url: &str) -> Result<AccountModel, AppError>;
    async fn set_cover_image(&self, account_id: &str, url: &str)
        -> Result<AccountModel, AppError>;

    /// Overwrites the stored refresh token. Returns false if the account does not exist.
    async fn set_refresh_token(
        &self,
        account_id: &str,
        token: Option<&str>,
    ) -> Result<bool, AppError>;

    /// Swaps in `replacement` only if the stored token still equals `expected`
    async fn replace_refresh_token(
        &self,
        account_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError>;
}

/// In-memory implementation of AccountRepository for development and testing
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, AccountModel>>,
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Applies `change` under the write lock and bumps `updated_at`
    async fn modify<F>(&self, account_id: &str, change: F) -> Result<AccountModel, AppError>
    where
        F: FnOnce(&mut AccountModel) + Send,
    {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(account_id).ok_or_else(|| {
            warn!(account_id = %account_id, "Account not found for update in memory");
            AppError::NotFound("User not found".to_string())
        })?;
        change(account);
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}

/// Usernames and emails share one namespace since login accepts either
fn identifiers_collide(a: &AccountModel, username: &str, email: &str) -> bool {
    [a.username.as_str(), a.email.as_str()]
        .iter()
        .any(|taken| *taken == username || *taken == email)
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    #[instrument(skip(self, account))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        debug!(account_id = %account.id, username = %account.username, "Creating account in memory");

        let mut accounts = self.accounts.write().await;
        let taken = accounts
            .values()
            .any(|a| identifiers_collide(a, &account.username, &account.email));
        if taken || accounts.contains_key(&account.id) {
            warn!(username = %account.username, "Account already exists in memory");
            return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
        }
        accounts.insert(account.id.clone(), account.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_account(&self, account_id: &str) -> Result<Option<AccountModel>, AppError> {
        let accounts = self.accounts.read().await;
        let account = accounts.get(account_id).cloned();
        debug!(account_id = %account_id, found = account.is_some(), "Fetched account from memory");
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        let username = normalize_identifier(username);
        let email = normalize_identifier(email);

        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.username == username)
            .or_else(|| accounts.values().find(|a| a.email == email))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountModel>, AppError> {
        let username = normalize_identifier(username);

        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    #[instrument(skip(self))]
    async fn update_details(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<AccountModel, AppError> {
        let email = normalize_identifier(email);

        let mut accounts = self.accounts.write().await;
        let clash = accounts
            .values()
            .any(|a| a.id != account_id && (a.email == email || a.username == email));
        if clash {
            warn!(account_id = %account_id, "Update would duplicate email");
            return Err(AppError::Conflict(DUPLICATE_ACCOUNT.to_string()));
        }

        let account = accounts.get_mut(account_id).ok_or_else(|| {
            warn!(account_id = %account_id, "Account not found for update in memory");
            AppError::NotFound("User not found".to_string())
        })?;
        account.full_name = full_name.trim().to_string();
        account.email = email;
        account.updated_at = Utc::now();
        debug!(account_id = %account_id, "Account details updated in memory");

        Ok(account.clone())
    }

    #[instrument(skip(self, password_hash))]
    async fn set_password_hash(
        &self,
        account_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        self.modify(account_id, |account| {
            account.password_hash = password_hash.to_string();
        })
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_avatar(&self, account_id: &str, url: &str) -> Result<AccountModel, AppError> {
        self.modify(account_id, |account| account.avatar = url.to_string())
            .await
    }

    #[instrument(skip(self))]
    async fn set_cover_image(
        &self,
        account_id: &str,
        url: &str,
    ) -> Result<AccountModel, AppError> {
        self.modify(account_id, |account| {
            account.cover_image = Some(url.to_string());
        })
        .await
    }

    #[instrument(skip(self, token))]
    async fn set_refresh_token(
        &self,
        account_id: &str,
        token: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_id) {
            Some(account) => {
                account.refresh_token = token.map(str::to_string);
                debug!(account_id = %account_id, cleared = token.is_none(), "Refresh token stored in memory");
                Ok(true)
            }
            None => {
                debug!(account_id = %account_id, "No account to store refresh token on");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self, expected, replacement))]
    async fn replace_refresh_token(
        &self,
        account_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_id) {
            Some(account) if account.refresh_token.as_deref() == Some(expected) => {
                account.refresh_token = Some(replacement.to_string());
                Ok(true)
            }
            _ => {
                debug!(account_id = %account_id, "Refresh token swap rejected");
                Ok(false)
            }
        }
    }
}

/// PostgreSQL implementation of account repository
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps sqlx errors, turning unique violations into conflicts
fn map_db_error(e: sqlx::Error) -> AppError {
    let unique_violation = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505");

    if unique_violation {
        AppError::Conflict(DUPLICATE_ACCOUNT.to_string())
    } else {
        warn!(error = %e, "Account query failed");
        AppError::Internal("Database error".to_string())
    }
}

fn account_not_found(account_id: &str) -> AppError {
    warn!(account_id = %account_id, "Account not found for update");
    AppError::NotFound("User not found".to_string())
}

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, password_hash, refresh_token, created_at, updated_at";

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self, account))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        debug!(account_id = %account.id, username = %account.username, "Creating account in database");

        sqlx::query(
            "INSERT INTO accounts (id, username, email, full_name, avatar, cover_image, password_hash, refresh_token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.avatar)
        .bind(&account.cover_image)
        .bind(&account.password_hash)
        .bind(&account.refresh_token)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_account(&self, account_id: &str) -> Result<Option<AccountModel>, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 OR email = $2 \
             ORDER BY (username = $1) DESC LIMIT 1"
        ))
        .bind(normalize_identifier(username))
        .bind(normalize_identifier(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountModel>, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1"
        ))
        .bind(normalize_identifier(username))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn update_details(
        &self,
        account_id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<AccountModel, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "UPDATE accounts SET full_name = $2, email = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(full_name.trim())
        .bind(normalize_identifier(email))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| account_not_found(account_id))
    }

    #[instrument(skip(self, password_hash))]
    async fn set_password_hash(
        &self,
        account_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(account_id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(account_not_found(account_id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_avatar(&self, account_id: &str, url: &str) -> Result<AccountModel, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "UPDATE accounts SET avatar = $2, updated_at = $3 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| account_not_found(account_id))
    }

    #[instrument(skip(self))]
    async fn set_cover_image(
        &self,
        account_id: &str,
        url: &str,
    ) -> Result<AccountModel, AppError> {
        sqlx::query_as::<_, AccountModel>(&format!(
            "UPDATE accounts SET cover_image = $2, updated_at = $3 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| account_not_found(account_id))
    }

    #[instrument(skip(self, token))]
    async fn set_refresh_token(
        &self,
        account_id: &str,
        token: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE accounts SET refresh_token = $2 WHERE id = $1")
            .bind(account_id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, expected, replacement))]
    async fn replace_refresh_token(
        &self,
        account_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(account_id)
        .bind(expected)
        .bind(replacement)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
