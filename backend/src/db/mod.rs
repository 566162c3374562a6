pub mod dynamodb_repository;
pub mod memory;

use async_trait::async_trait;
use shared::{Notification, PredictionRecord};
use uuid::Uuid;

pub use dynamodb_repository::DynamoDbStore;
pub use memory::InMemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Item not found")]
    NotFound,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

/// Prediction history and user notifications.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<(), RepositoryError>;

    /// Newest first, at most `limit` records.
    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, RepositoryError>;

    async fn create_notification(&self, notification: &Notification) -> Result<(), RepositoryError>;

    /// Newest first.
    async fn unread_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, RepositoryError>;

    /// `NotFound` when the notification does not exist or belongs to another user.
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), RepositoryError>;
}
