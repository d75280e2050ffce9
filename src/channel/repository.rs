use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::shared::AppError;

/// A subscriber following a channel; both sides are account ids
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub subscriber_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionModel {
    pub fn new(subscriber_id: &str, channel_id: &str) -> Self {
        Self {
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Trait for subscription store operations
#[async_trait]
pub trait SubscriptionRepository {
    /// Returns false if the subscription already existed
    async fn subscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError>;
    /// Returns false if there was nothing to remove
    async fn unsubscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError>;
    async fn is_subscribed(&self, subscriber_id: &str, channel_id: &str)
        -> Result<bool, AppError>;
    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError>;
    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError>;
}

/// In-memory implementation of SubscriptionRepository for development and testing
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<Vec<SubscriptionModel>>,
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    #[instrument(skip(self))]
    async fn subscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError> {
        let mut subscriptions = self.subscriptions.write().await;
        let exists = subscriptions
            .iter()
            .any(|s| s.subscriber_id == subscriber_id && s.channel_id == channel_id);
        if exists {
            return Ok(false);
        }

        subscriptions.push(SubscriptionModel::new(subscriber_id, channel_id));
        debug!("Subscription stored in memory");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError> {
        let mut subscriptions = self.subscriptions.write().await;
        let before = subscriptions.len();
        subscriptions.retain(|s| !(s.subscriber_id == subscriber_id && s.channel_id == channel_id));
        Ok(subscriptions.len() < before)
    }

    async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .iter()
            .any(|s| s.subscriber_id == subscriber_id && s.channel_id == channel_id))
    }

    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .iter()
            .filter(|s| s.channel_id == channel_id)
            .count() as u64)
    }

    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .count() as u64)
    }
}

/// PostgreSQL implementation of subscription repository
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_error(e: sqlx::Error) -> AppError {
    warn!(error = %e, "Subscription query failed");
    AppError::Internal("Database error".to_string())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    #[instrument(skip(self))]
    async fn subscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO subscriptions (subscriber_id, channel_id, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (subscriber_id, channel_id) DO NOTHING",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, subscriber_id: &str, channel_id: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2")
                .bind(subscriber_id)
                .bind(channel_id)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2)",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_one(&self.pool)
            .await
            .map(|count| count as u64)
            .map_err(map_db_error)
    }

    async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1",
        )
        .bind(subscriber_id)
        .fetch_one(&self.pool)
        .await
        .map(|count| count as u64)
        .map_err(map_db_error)
    }
}
