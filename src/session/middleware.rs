use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use super::cookies::ACCESS_COOKIE_NAME;
use crate::shared::{AppError, AppState};

/// Access token from the `accessToken` cookie, falling back to an
/// `Authorization: Bearer` header
fn extract_access_token(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(cookie) = jar.get(ACCESS_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// JWT authentication middleware - resolves the access token to an account and
/// adds the `AccountModel` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), session::jwt_auth))
/// Handlers can then extract Extension(account): Extension<AccountModel>.
#[instrument(skip(state, req, next))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_access_token(&req).ok_or_else(|| {
        warn!(uri = %req.uri(), "Missing access token");
        AppError::Unauthorized("Unauthorized request".to_string())
    })?;

    let account = match state.session_manager.verify_access_token(&token).await {
        Ok(account) => account,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    info!(
        account_id = %account.id,
        username = %account.username,
        "Authentication successful, adding account to request"
    );

    req.extensions_mut().insert(account);

    Ok(next.run(req).await)
}
