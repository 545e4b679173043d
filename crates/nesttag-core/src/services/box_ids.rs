/// Registry of issued box IDs
use crate::constants::BATCH_WRITE_LIMIT;
use crate::error::BoxError;
use crate::models::BoxIdRecord;
use crate::models::attributes::{self, Item};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{PutRequest, WriteRequest};
use tracing::{info, warn};

#[async_trait]
pub trait BoxIdRegistry: Send + Sync {
    async fn get(&self, box_id: &str) -> Result<Option<BoxIdRecord>, BoxError>;

    async fn put(&self, record: &BoxIdRecord) -> Result<(), BoxError>;

    async fn list(&self) -> Result<Vec<BoxIdRecord>, BoxError>;

    async fn delete(&self, box_id: &str) -> Result<(), BoxError>;

    /// Writes up to 25 records in one request and returns how many were left unprocessed
    async fn put_batch(&self, records: &[BoxIdRecord]) -> Result<usize, BoxError>;
}

pub(crate) fn check_batch_size(records: &[BoxIdRecord]) -> Result<(), BoxError> {
    if records.len() > BATCH_WRITE_LIMIT {
        return Err(BoxError::Validation(format!(
            "Batch of {} exceeds the limit of {} items",
            records.len(),
            BATCH_WRITE_LIMIT
        )));
    }
    Ok(())
}

pub struct DynamoBoxIdRegistry {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoBoxIdRegistry {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl BoxIdRegistry for DynamoBoxIdRegistry {
    async fn get(&self, box_id: &str) -> Result<Option<BoxIdRecord>, BoxError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("boxId", attributes::string(box_id))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB get_item failed: {}", e)))?;

        result.item().map(BoxIdRecord::from_item).transpose()
    }

    async fn put(&self, record: &BoxIdRecord) -> Result<(), BoxError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB put_item failed: {}", e)))?;

        info!(box_id = %record.box_id, "Registered box ID");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BoxIdRecord>, BoxError> {
        let mut records = Vec::new();
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

            for item in page.items() {
                records.push(BoxIdRecord::from_item(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn delete(&self, box_id: &str) -> Result<(), BoxError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("boxId", attributes::string(box_id))
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB delete_item failed: {}", e)))?;

        info!(box_id = box_id, "Deleted box ID");
        Ok(())
    }

    async fn put_batch(&self, records: &[BoxIdRecord]) -> Result<usize, BoxError> {
        check_batch_size(records)?;
        if records.is_empty() {
            return Ok(0);
        }

        let requests = records
            .iter()
            .map(|record| {
                PutRequest::builder()
                    .set_item(Some(record.to_item()))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
                    .map_err(|e| BoxError::Database(format!("Invalid put request: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| BoxError::Database(format!("DynamoDB batch_write_item failed: {}", e)))?;

        let unprocessed = result
            .unprocessed_items()
            .and_then(|items| items.get(&self.table_name))
            .map_or(0, Vec::len);

        if unprocessed > 0 {
            warn!(
                unprocessed = unprocessed,
                batch_size = records.len(),
                "Batch write left items unprocessed"
            );
        }

        Ok(unprocessed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryBoxIdRegistry;
    use chrono::Utc;

    fn records(count: usize) -> Vec<BoxIdRecord> {
        let now = Utc::now();
        (0..count)
            .map(|i| BoxIdRecord::new(&format!("NT-{:04}", i), "2030-01-01", now))
            .collect()
    }

    #[tokio::test]
    async fn test_put_batch_stores_all_records() {
        let registry = InMemoryBoxIdRegistry::new();
        assert_eq!(registry.put_batch(&records(25)).await.unwrap(), 0);

        let listed = registry.list().await.unwrap();
        assert_eq!(listed.len(), 25);
        assert_eq!(listed[0].box_id, "NT-0000");
    }

    #[tokio::test]
    async fn test_put_batch_rejects_oversized_batches() {
        let registry = InMemoryBoxIdRegistry::new();
        let result = registry.put_batch(&records(26)).await;
        assert!(matches!(result, Err(BoxError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let registry = InMemoryBoxIdRegistry::new();
        let record = records(1).remove(0);
        registry.put(&record).await.unwrap();
        assert_eq!(registry.get("NT-0000").await.unwrap(), Some(record));

        registry.delete("NT-0000").await.unwrap();
        assert!(registry.get("NT-0000").await.unwrap().is_none());
    }
}
