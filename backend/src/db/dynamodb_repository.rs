use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use shared::{Notification, NotificationKind, PredictionKind, PredictionRecord};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::{PredictionStore, RepositoryError};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
    predictions_table: String,
    notifications_table: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, predictions_table: String, notifications_table: String) -> Self {
        Self {
            client,
            predictions_table,
            notifications_table,
        }
    }

    /// Full scan of `table` filtered by `filter`, following pagination.
    async fn scan_all(
        &self,
        table: &str,
        filter: &str,
        values: HashMap<String, AttributeValue>,
    ) -> Result<Vec<Item>, RepositoryError> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let result = self
                .client
                .scan()
                .table_name(table)
                .filter_expression(filter)
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

            if let Some(page) = result.items {
                items.extend(page);
            }
            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(items)
    }

    fn parse_prediction_from_item(item: &Item) -> Result<PredictionRecord, RepositoryError> {
        let id = get_uuid(item, "id")?;
        let user_id = get_uuid(item, "user_id")?;

        let prediction_type = item
            .get("prediction_type")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| PredictionKind::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid prediction_type".to_string()))?;

        let input_data = get_string(item, "input_data")?;
        let result = get_string(item, "result")?;

        let confidence_score = item
            .get("confidence_score")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<f64>().ok())
            .ok_or_else(|| RepositoryError::InvalidData("Invalid confidence_score".to_string()))?;

        Ok(PredictionRecord {
            id,
            user_id,
            prediction_type,
            input_data,
            result,
            confidence_score,
            created_at: get_timestamp(item, "created_at")?,
        })
    }

    fn parse_notification_from_item(item: &Item) -> Result<Notification, RepositoryError> {
        let notification_type = item
            .get("notification_type")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| NotificationKind::from_str(s).ok())
            .unwrap_or(NotificationKind::System);

        let is_read = *item
            .get("is_read")
            .and_then(|v| v.as_bool().ok())
            .unwrap_or(&false);

        Ok(Notification {
            id: get_uuid(item, "id")?,
            user_id: get_uuid(item, "user_id")?,
            title: get_string(item, "title")?,
            message: get_string(item, "message")?,
            notification_type,
            is_read,
            created_at: get_timestamp(item, "created_at")?,
        })
    }
}

fn get_string(item: &Item, field: &str) -> Result<String, RepositoryError> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", field)))
}

fn get_uuid(item: &Item, field: &str) -> Result<Uuid, RepositoryError> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", field)))
}

fn get_timestamp(item: &Item, field: &str) -> Result<DateTime<Utc>, RepositoryError> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", field)))
}

fn user_filter(user_id: Uuid) -> HashMap<String, AttributeValue> {
    HashMap::from([(":user_id".to_string(), AttributeValue::S(user_id.to_string()))])
}

#[async_trait]
impl PredictionStore for DynamoDbStore {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<(), RepositoryError> {
        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
        item.insert(
            "user_id".to_string(),
            AttributeValue::S(record.user_id.to_string()),
        );
        item.insert(
            "prediction_type".to_string(),
            AttributeValue::S(record.prediction_type.to_string()),
        );
        item.insert(
            "input_data".to_string(),
            AttributeValue::S(record.input_data.clone()),
        );
        item.insert("result".to_string(), AttributeValue::S(record.result.clone()));
        item.insert(
            "confidence_score".to_string(),
            AttributeValue::N(record.confidence_score.to_string()),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(record.created_at.to_rfc3339()),
        );

        self.client
            .put_item()
            .table_name(&self.predictions_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB put_item failed for prediction {}: {:?}", record.id, e);
                RepositoryError::DynamoDb(e.to_string())
            })?;
        log::debug!("Saved {} prediction {}", record.prediction_type, record.id);
        Ok(())
    }

    async fn recent_predictions(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let items = self
            .scan_all(&self.predictions_table, "user_id = :user_id", user_filter(user_id))
            .await?;

        let mut records = items
            .iter()
            .map(Self::parse_prediction_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn create_notification(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let mut item = HashMap::new();
        item.insert(
            "id".to_string(),
            AttributeValue::S(notification.id.to_string()),
        );
        item.insert(
            "user_id".to_string(),
            AttributeValue::S(notification.user_id.to_string()),
        );
        item.insert(
            "title".to_string(),
            AttributeValue::S(notification.title.clone()),
        );
        item.insert(
            "message".to_string(),
            AttributeValue::S(notification.message.clone()),
        );
        item.insert(
            "notification_type".to_string(),
            AttributeValue::S(notification.notification_type.to_string()),
        );
        item.insert(
            "is_read".to_string(),
            AttributeValue::Bool(notification.is_read),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(notification.created_at.to_rfc3339()),
        );

        self.client
            .put_item()
            .table_name(&self.notifications_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }

    async fn unread_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, RepositoryError> {
        let mut values = user_filter(user_id);
        values.insert(":is_read".to_string(), AttributeValue::Bool(false));
        let items = self
            .scan_all(
                &self.notifications_table,
                "user_id = :user_id AND is_read = :is_read",
                values,
            )
            .await?;

        let mut notifications = items
            .iter()
            .map(Self::parse_notification_from_item)
            .collect::<Result<Vec<_>, _>>()?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.notifications_table)
            .key("id", AttributeValue::S(notification_id.to_string()))
            .update_expression("SET is_read = :is_read")
            .condition_expression("attribute_exists(id) AND user_id = :user_id")
            .expression_attribute_values(":is_read", AttributeValue::Bool(true))
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(RepositoryError::DynamoDb(e.to_string())),
        }
    }
}
