use async_trait::async_trait;
use shared::{Notification, PredictionRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PredictionStore, RepositoryError};

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    predictions: RwLock<Vec<PredictionRecord>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PredictionStore for InMemoryStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<(), RepositoryError> {
        self.predictions.write().await.push(record.clone());
        Ok(())
    }

    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let predictions = self.predictions.read().await;
        let mut records: Vec<PredictionRecord> = predictions
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps; reverse puts latest first
        records.sort_by_key(|r| r.created_at);
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    async fn create_notification(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn unread_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut unread: Vec<Notification> = notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned()
            .collect();
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(unread)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&notification_id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = true;
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}
