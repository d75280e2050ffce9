use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::account::{repository::AccountRepository, service::AccountService};
use crate::channel::{repository::SubscriptionRepository, service::ChannelService};
use crate::config::{CookieSettings, TokenSettings};
use crate::media::MediaUploader;
use crate::response::ErrorBody;
use crate::session::manager::SessionTokenManager;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub account_repository: Arc<dyn AccountRepository + Send + Sync>,
    pub subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync>,
    pub session_manager: Arc<SessionTokenManager>,
    pub account_service: Arc<AccountService>,
    pub channel_service: Arc<ChannelService>,
    pub upload_temp_dir: PathBuf,
    pub cookies: CookieSettings,
}

impl AppState {
    pub fn new(
        account_repository: Arc<dyn AccountRepository + Send + Sync>,
        subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync>,
        uploader: Arc<dyn MediaUploader>,
        token_settings: TokenSettings,
        upload_temp_dir: PathBuf,
        cookies: CookieSettings,
    ) -> Self {
        let session_manager = Arc::new(SessionTokenManager::new(
            Arc::clone(&account_repository),
            token_settings,
        ));
        let account_service = Arc::new(AccountService::new(
            Arc::clone(&account_repository),
            uploader,
        ));
        let channel_service = Arc::new(ChannelService::new(
            Arc::clone(&account_repository),
            Arc::clone(&subscription_repository),
        ));

        Self {
            account_repository,
            subscription_repository,
            session_manager,
            account_service,
            channel_service,
            upload_temp_dir,
            cookies,
        }
    }
}

/// Every failure an operation can end in. Messages are safe to show to
/// clients; underlying causes are logged where they are mapped.
#[derive(Error, Debug, PartialEq)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn validation_with(message: impl Into<String>, errors: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        debug!(status = status.as_u16(), error = %self, "Returning error response");

        let (message, errors) = match self {
            AppError::Validation { message, errors } => (message, errors),
            AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Internal(msg) => (msg, Vec::new()),
        };

        let body = Json(ErrorBody {
            status_code: status.as_u16(),
            message,
            success: false,
            errors,
        });

        (status, body).into_response()
    }
}
