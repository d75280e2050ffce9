use axum::{
    extract::{Path, State},
    Extension,
};
use tracing::{info, instrument};

use super::service::{ChannelProfile, SubscriptionState};
use crate::account::models::AccountModel;
use crate::response::ApiResponse;
use crate::shared::{AppError, AppState};

/// GET /api/v1/users/c/:username
#[instrument(name = "channel_profile", skip(state, viewer))]
pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(viewer): Extension<AccountModel>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>, AppError> {
    let profile = state
        .channel_service
        .channel_profile(&username, &viewer.id)
        .await?;

    info!(channel_id = %profile.id, "Channel profile fetched");
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// POST /api/v1/users/c/:username/subscription
#[instrument(name = "toggle_subscription", skip(state, viewer))]
pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(viewer): Extension<AccountModel>,
    Path(username): Path<String>,
) -> Result<ApiResponse<SubscriptionState>, AppError> {
    let subscription = state
        .channel_service
        .toggle_subscription(&viewer.id, &username)
        .await?;

    let message = if subscription.is_subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(subscription, message))
}
