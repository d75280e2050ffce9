use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    models::AccountModel,
    service::RegisterAccount,
    types::{AccountResponse, ChangePasswordRequest, UpdateAccountRequest},
};
use crate::media::read_multipart;
use crate::response::ApiResponse;
use crate::shared::{AppError, AppState};

/// HTTP handler for registering a new account
///
/// POST /api/v1/users/register
/// Multipart form: fullName, email, username, password, avatar (file), coverImage (file, optional)
#[instrument(name = "register", skip_all)]
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let mut form = read_multipart(multipart, &state.upload_temp_dir).await?;

    let request = RegisterAccount {
        full_name: form.text("fullName").unwrap_or_default().to_string(),
        email: form.text("email").unwrap_or_default().to_string(),
        username: form.text("username").unwrap_or_default().to_string(),
        password: form.text("password").unwrap_or_default().to_string(),
        avatar: form.take_file("avatar"),
        cover_image: form.take_file("coverImage"),
    };
    form.discard_files().await;

    info!(username = %request.username, "Registering account");
    let account = state.account_service.register(request).await?;

    Ok(ApiResponse::created(
        account.into(),
        "User registered Successfully",
    ))
}

/// GET /api/v1/users/current-user
#[instrument(name = "current_user", skip_all)]
pub async fn current_user(
    Extension(account): Extension<AccountModel>,
) -> ApiResponse<AccountResponse> {
    ApiResponse::ok(account.into(), "User fetched successfully")
}

/// POST /api/v1/users/change-password
#[instrument(name = "change_password", skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(account): Extension<AccountModel>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>, AppError> {
    state
        .account_service
        .change_password(&account.id, &request.old_password, &request.new_password)
        .await?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// PATCH /api/v1/users/update-account
#[instrument(name = "update_account", skip_all)]
pub async fn update_account(
    State(state): State<AppState>,
    Extension(account): Extension<AccountModel>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let updated = state
        .account_service
        .update_details(&account.id, &request.full_name, &request.email)
        .await?;

    Ok(ApiResponse::ok(
        updated.into(),
        "Account details updated successfully",
    ))
}

/// PATCH /api/v1/users/avatar
#[instrument(name = "update_avatar", skip_all)]
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(account): Extension<AccountModel>,
    multipart: Multipart,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let mut form = read_multipart(multipart, &state.upload_temp_dir).await?;
    let file = form.take_file("avatar");
    form.discard_files().await;

    let updated = state
        .account_service
        .update_avatar(&account.id, file)
        .await?;

    Ok(ApiResponse::ok(
        updated.into(),
        "Avatar image updated successfully",
    ))
}

/// PATCH /api/v1/users/cover-image
#[instrument(name = "update_cover_image", skip_all)]
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(account): Extension<AccountModel>,
    multipart: Multipart,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let mut form = read_multipart(multipart, &state.upload_temp_dir).await?;
    let file = form.take_file("coverImage");
    form.discard_files().await;

    let updated = state
        .account_service
        .update_cover_image(&account.id, file)
        .await?;

    Ok(ApiResponse::ok(
        updated.into(),
        "Cover image updated successfully",
    ))
}
