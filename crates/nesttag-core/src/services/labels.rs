/// Label persistence
use crate::constants::USER_ID_INDEX;
use crate::error::BoxError;
use crate::models::attributes::{self, Item};
use crate::models::label::normalize_color;
use crate::models::{Label, timestamp};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::ReturnValue;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn put(&self, label: &Label) -> Result<(), BoxError>;

    /// Renames or recolors a label; fails with `NotFound` when it does not exist
    async fn update(
        &self,
        id: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Label, BoxError>;

    async fn delete(&self, id: &str) -> Result<(), BoxError>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Label>, BoxError>;
}

pub struct DynamoLabelStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoLabelStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl LabelStore for DynamoLabelStore {
    async fn put(&self, label: &Label) -> Result<(), BoxError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(label.to_item()))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB put_item failed: {}", e)))?;
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Label, BoxError> {
        let (expression, names, values) = attributes::set_clause(vec![
            ("name", attributes::string(name)),
            ("color", attributes::string(normalize_color(color))),
            (
                "description",
                attributes::optional_string(description.filter(|d| !d.is_empty())),
            ),
            ("updatedAt", attributes::string(timestamp(now))),
        ]);

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
                    BoxError::NotFound(format!("Label {}", id))
                } else {
                    BoxError::Database(format!("DynamoDB update_item failed: {}", e))
                }
            })?;

        let item = result
            .attributes()
            .ok_or_else(|| BoxError::Database("update_item returned no attributes".to_string()))?;
        Label::from_item(item)
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", attributes::string(id))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB delete_item failed: {}", e)))?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Label>, BoxError> {
        let mut labels = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_ID_INDEX)
                .key_condition_expression("userId = :userId")
                .expression_attribute_values(":userId", attributes::string(user_id))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| BoxError::Database(format!("DynamoDB query failed: {}", e)))?;

            for item in page.items() {
                labels.push(Label::from_item(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(labels)
    }
}
