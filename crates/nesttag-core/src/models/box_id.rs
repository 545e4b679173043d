/// Registry entries for issued box IDs
use super::attributes::{self, Item};
use super::box_record::parse_timestamp;
use super::timestamp;
use crate::error::BoxError;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxIdRecord {
    #[serde(rename = "id")]
    pub box_id: String,
    pub activation_date: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BoxIdRecord {
    pub fn new(box_id: &str, activation_date: &str, now: DateTime<Utc>) -> Self {
        let created = timestamp(now);
        Self {
            box_id: box_id.to_string(),
            activation_date: activation_date.to_string(),
            is_active: true,
            created_at: created.clone(),
            updated_at: created,
        }
    }

    /// An ID may be claimed while it is active and its activation deadline has not passed
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        // Date-only deadlines include the whole day
        if let Ok(date) = NaiveDate::parse_from_str(self.activation_date.trim(), "%Y-%m-%d") {
            return now.date_naive() <= date;
        }
        match parse_timestamp(&self.activation_date) {
            Some(deadline) => now <= deadline,
            None => true,
        }
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("boxId".to_string(), attributes::string(&self.box_id));
        item.insert(
            "activationDate".to_string(),
            attributes::string(&self.activation_date),
        );
        item.insert("isActive".to_string(), AttributeValue::Bool(self.is_active));
        item.insert("createdAt".to_string(), attributes::string(&self.created_at));
        item.insert("updatedAt".to_string(), attributes::string(&self.updated_at));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self, BoxError> {
        Ok(Self {
            box_id: attributes::require_string(item, "boxId")?,
            activation_date: attributes::get_string(item, "activationDate").unwrap_or_default(),
            is_active: attributes::get_bool(item, "isActive").unwrap_or(true),
            created_at: attributes::get_string(item, "createdAt").unwrap_or_default(),
            updated_at: attributes::get_string(item, "updatedAt").unwrap_or_default(),
        })
    }
}
