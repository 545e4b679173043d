/// User-defined labels attached to boxes
use super::attributes::{self, Item};
use super::timestamp;
use crate::constants::{DEFAULT_LABEL_COLOR, LABEL_ID_PREFIX};
use crate::error::BoxError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Label {
    pub fn new(
        user_id: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let created = timestamp(now);
        Self {
            id: format!("{}-{}", LABEL_ID_PREFIX, now.timestamp_millis()),
            user_id: user_id.to_string(),
            name: name.to_string(),
            color: normalize_color(color),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            created_at: created.clone(),
            updated_at: created,
        }
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), attributes::string(&self.id));
        item.insert("userId".to_string(), attributes::string(&self.user_id));
        item.insert("name".to_string(), attributes::string(&self.name));
        item.insert("color".to_string(), attributes::string(&self.color));
        item.insert(
            "description".to_string(),
            attributes::optional_string(self.description.as_deref()),
        );
        item.insert("createdAt".to_string(), attributes::string(&self.created_at));
        item.insert("updatedAt".to_string(), attributes::string(&self.updated_at));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self, BoxError> {
        Ok(Self {
            id: attributes::require_string(item, "id")?,
            user_id: attributes::get_string(item, "userId").unwrap_or_default(),
            name: attributes::get_string(item, "name").unwrap_or_default(),
            color: attributes::get_string(item, "color")
                .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
            description: attributes::get_string(item, "description"),
            created_at: attributes::get_string(item, "createdAt").unwrap_or_default(),
            updated_at: attributes::get_string(item, "updatedAt").unwrap_or_default(),
        })
    }
}

/// Falls back to the default color for missing or empty values
pub fn normalize_color(color: Option<&str>) -> String {
    color
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(DEFAULT_LABEL_COLOR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_label_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let label = Label::new("user-1", "Kitchen", None, Some(""), now);
        assert_eq!(label.id, format!("custom-{}", now.timestamp_millis()));
        assert_eq!(label.color, "#0366d6");
        assert!(label.description.is_none());
        assert_eq!(Label::from_item(&label.to_item()).unwrap(), label);
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color(Some("#ff0000")), "#ff0000");
        assert_eq!(normalize_color(Some("  ")), "#0366d6");
    }
}
