use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use super::repository::SubscriptionRepository;
use crate::account::{models::AccountModel, repository::AccountRepository};
use crate::shared::AppError;

/// Public channel view of an account, with subscription counts relative to the viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscribers_count: u64,
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub channel: String,
    pub is_subscribed: bool,
}

pub struct ChannelService {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
}

impl ChannelService {
    pub fn new(
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
    ) -> Self {
        Self {
            accounts,
            subscriptions,
        }
    }

    async fn find_channel(&self, username: &str) -> Result<AccountModel, AppError> {
        if username.trim().is_empty() {
            return Err(AppError::validation("username is missing"));
        }

        self.accounts
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: &str,
    ) -> Result<ChannelProfile, AppError> {
        let channel = self.find_channel(username).await?;

        let subscribers_count = self.subscriptions.count_subscribers(&channel.id).await?;
        let channels_subscribed_to_count =
            self.subscriptions.count_subscriptions(&channel.id).await?;
        let is_subscribed = self
            .subscriptions
            .is_subscribed(viewer_id, &channel.id)
            .await?;

        Ok(ChannelProfile {
            id: channel.id,
            full_name: channel.full_name,
            username: channel.username,
            email: channel.email,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
        })
    }

    /// Subscribes the viewer to the channel, or unsubscribes if already subscribed
    #[instrument(skip(self))]
    pub async fn toggle_subscription(
        &self,
        viewer_id: &str,
        username: &str,
    ) -> Result<SubscriptionState, AppError> {
        let channel = self.find_channel(username).await?;
        if channel.id == viewer_id {
            return Err(AppError::validation("Cannot subscribe to your own channel"));
        }

        let is_subscribed = if self.subscriptions.unsubscribe(viewer_id, &channel.id).await? {
            false
        } else {
            self.subscriptions.subscribe(viewer_id, &channel.id).await?;
            true
        };

        info!(channel_id = %channel.id, is_subscribed, "Subscription toggled");
        Ok(SubscriptionState {
            channel: channel.username,
            is_subscribed,
        })
    }
}
