use axum::{extract::State, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    cookies::{self, REFRESH_COOKIE_NAME},
    types::{LoginRequest, LoginResponse, RefreshRequest, TokenPair},
};
use crate::account::models::AccountModel;
use crate::response::ApiResponse;
use crate::shared::{AppError, AppState};

/// HTTP handler for logging in
///
/// POST /api/v1/users/login
/// Sets both token cookies and returns the account with its tokens
#[instrument(name = "login", skip(state, jar, request))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), AppError> {
    let identifier = request
        .identifier()
        .ok_or_else(|| AppError::validation("username or email is required"))?;
    info!(identifier = %identifier, "Logging in");

    let account = state
        .session_manager
        .authenticate(identifier, &request.password)
        .await?;
    let tokens = state.session_manager.issue_tokens(&account.id).await?;

    info!(account_id = %account.id, "User logged in");

    let jar = cookies::with_tokens(jar, &tokens, &state.cookies);
    let body = LoginResponse {
        user: account.into(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };

    Ok((jar, ApiResponse::ok(body, "User logged In Successfully")))
}

/// HTTP handler for logging out
///
/// POST /api/v1/users/logout
#[instrument(name = "logout", skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(account): Extension<AccountModel>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>), AppError> {
    state.session_manager.revoke(&account.id).await?;

    info!(account_id = %account.id, "User logged out");

    Ok((
        cookies::without_tokens(jar, &state.cookies),
        ApiResponse::ok(json!({}), "User logged Out"),
    ))
}

/// HTTP handler for refreshing the access token
///
/// POST /api/v1/users/refresh-token
/// Accepts the refresh token from its cookie or from the JSON body
#[instrument(name = "refresh_access_token", skip(state, jar, body))]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, ApiResponse<TokenPair>), AppError> {
    let presented = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| body.and_then(|Json(request)| request.refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let tokens = state
        .session_manager
        .rotate_refresh_token(&presented)
        .await?;

    info!("Access token refreshed");

    let jar = cookies::with_tokens(jar, &tokens, &state.cookies);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}
