/// Box persistence
use crate::constants::USER_ID_INDEX;
use crate::error::BoxError;
use crate::models::attributes::{self, Item};
use crate::models::{BoxDraft, BoxRecord, timestamp};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

#[async_trait]
pub trait BoxStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<BoxRecord>, BoxError>;

    async fn put(&self, record: &BoxRecord) -> Result<(), BoxError>;

    /// Replaces the editable fields of an existing box and returns the stored record
    ///
    /// Fails with `NotFound` when the box does not exist
    async fn update_content(
        &self,
        id: &str,
        draft: &BoxDraft,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError>;

    async fn set_favorite(
        &self,
        id: &str,
        is_favorite: bool,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError>;

    async fn delete(&self, id: &str) -> Result<(), BoxError>;

    /// Every box in the table
    async fn scan(&self) -> Result<Vec<BoxRecord>, BoxError>;

    /// Boxes owned by a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BoxRecord>, BoxError>;
}

/// DynamoDB-backed box store
pub struct DynamoBoxStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoBoxStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    async fn update(
        &self,
        id: &str,
        fields: Vec<(&str, AttributeValue)>,
    ) -> Result<BoxRecord, BoxError> {
        let (expression, names, values) = attributes::set_clause(fields);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("id", attributes::string(id))
            .update_expression(expression)
            .condition_expression("attribute_exists(id)")
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception())
                {
                    BoxError::NotFound(format!("Box {}", id))
                } else {
                    BoxError::Database(format!("DynamoDB update_item failed: {}", e))
                }
            })?;

        let item = result
            .attributes()
            .ok_or_else(|| BoxError::Database("update_item returned no attributes".to_string()))?;
        BoxRecord::from_item(item)
    }
}

fn records(items: &[Item]) -> Result<Vec<BoxRecord>, BoxError> {
    items.iter().map(BoxRecord::from_item).collect()
}

#[async_trait]
impl BoxStore for DynamoBoxStore {
    async fn get(&self, id: &str) -> Result<Option<BoxRecord>, BoxError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", attributes::string(id))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB get_item failed: {}", e)))?;

        result.item().map(BoxRecord::from_item).transpose()
    }

    async fn put(&self, record: &BoxRecord) -> Result<(), BoxError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB put_item failed: {}", e)))?;

        debug!(box_id = %record.id, "Stored box");
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        draft: &BoxDraft,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError> {
        self.update(
            id,
            vec![
                ("title", attributes::string(draft.title())),
                ("memo", attributes::string(draft.memo())),
                ("imageUrls", attributes::string_list(&draft.image_urls())),
                (
                    "voiceMemoUrls",
                    attributes::string_list(&draft.voice_memo_urls()),
                ),
                ("isFavorite", AttributeValue::Bool(draft.is_favorite())),
                ("password", attributes::optional_string(draft.password())),
                ("expiresAt", attributes::optional_string(draft.expires_at())),
                ("labels", attributes::string_list(&draft.labels())),
                ("updatedAt", attributes::string(timestamp(now))),
            ],
        )
        .await
    }

    async fn set_favorite(
        &self,
        id: &str,
        is_favorite: bool,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError> {
        self.update(
            id,
            vec![
                ("isFavorite", AttributeValue::Bool(is_favorite)),
                ("updatedAt", attributes::string(timestamp(now))),
            ],
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", attributes::string(id))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB delete_item failed: {}", e)))?;

        info!(box_id = id, "Deleted box");
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<BoxRecord>, BoxError> {
        let mut boxes = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| BoxError::Database(format!("DynamoDB scan failed: {}", e)))?;

            boxes.extend(records(page.items())?);

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!(count = boxes.len(), "Scanned boxes");
        Ok(boxes)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BoxRecord>, BoxError> {
        let mut boxes = Vec::new();
        let mut start_key: Option<Item> = None;
        let values: HashMap<String, AttributeValue> =
            HashMap::from([(":userId".to_string(), attributes::string(user_id))]);

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_ID_INDEX)
                .key_condition_expression("userId = :userId")
                .set_expression_attribute_values(Some(values.clone()))
                .scan_index_forward(false)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| BoxError::Database(format!("DynamoDB query failed: {}", e)))?;

            boxes.extend(records(page.items())?);

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(boxes)
    }
}
