/// Box records and the values derived from them
use super::attributes::{self, Item};
use super::timestamp;
use crate::constants::SECONDS_PER_DAY;
use crate::error::BoxError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BoxRecord {
    #[builder(setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub user_id: String,
    #[builder(default, setter(into))]
    pub title: String,
    #[builder(default, setter(into))]
    pub memo: String,
    #[builder(default)]
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[builder(default)]
    #[serde(default)]
    pub voice_memo_urls: Vec<String>,
    #[builder(default)]
    #[serde(default)]
    pub is_favorite: bool,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub expires_at: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub labels: Vec<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[builder(setter(into))]
    pub created_at: String,
    #[builder(setter(into))]
    pub updated_at: String,
}

/// Client-editable fields of a box
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxDraft {
    pub title: Option<String>,
    pub memo: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub voice_memo_urls: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub password: Option<String>,
    pub expires_at: Option<String>,
    pub labels: Option<Vec<String>>,
}

impl BoxDraft {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn memo(&self) -> &str {
        self.memo.as_deref().unwrap_or_default()
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.image_urls.clone().unwrap_or_default()
    }

    pub fn voice_memo_urls(&self) -> Vec<String> {
        self.voice_memo_urls.clone().unwrap_or_default()
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite.unwrap_or(false)
    }

    /// Empty strings mean "no password"
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref().filter(|e| !e.is_empty())
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.clone().unwrap_or_default()
    }
}

impl BoxRecord {
    /// Creates a new record owned by `user_id` from a client draft
    pub fn create(id: &str, user_id: &str, draft: &BoxDraft, now: DateTime<Utc>) -> Self {
        let now = timestamp(now);
        let mut record = BoxRecord::builder()
            .id(id)
            .user_id(user_id)
            .title(draft.title())
            .memo(draft.memo())
            .image_urls(draft.image_urls())
            .voice_memo_urls(draft.voice_memo_urls())
            .is_favorite(draft.is_favorite())
            .labels(draft.labels())
            .created_at(now.clone())
            .updated_at(now)
            .build();
        record.password = draft.password().map(str::to_string);
        record.expires_at = draft.expires_at().map(str::to_string);
        record
    }

    /// Replaces the editable fields, leaving ownership and creation time intact
    pub fn apply(&mut self, draft: &BoxDraft, now: DateTime<Utc>) {
        self.title = draft.title().to_string();
        self.memo = draft.memo().to_string();
        self.image_urls = draft.image_urls();
        self.voice_memo_urls = draft.voice_memo_urls();
        self.is_favorite = draft.is_favorite();
        self.password = draft.password().map(str::to_string);
        self.expires_at = draft.expires_at().map(str::to_string);
        self.labels = draft.labels();
        self.updated_at = timestamp(now);
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), attributes::string(&self.id));
        item.insert("userId".to_string(), attributes::string(&self.user_id));
        item.insert("title".to_string(), attributes::string(&self.title));
        item.insert("memo".to_string(), attributes::string(&self.memo));
        item.insert("imageUrls".to_string(), attributes::string_list(&self.image_urls));
        item.insert(
            "voiceMemoUrls".to_string(),
            attributes::string_list(&self.voice_memo_urls),
        );
        item.insert(
            "isFavorite".to_string(),
            aws_sdk_dynamodb::types::AttributeValue::Bool(self.is_favorite),
        );
        item.insert(
            "password".to_string(),
            attributes::optional_string(self.password.as_deref()),
        );
        item.insert(
            "expiresAt".to_string(),
            attributes::optional_string(self.expires_at.as_deref()),
        );
        item.insert("labels".to_string(), attributes::string_list(&self.labels));
        if let Some(status) = &self.status {
            item.insert("status".to_string(), attributes::string(status));
        }
        item.insert("createdAt".to_string(), attributes::string(&self.created_at));
        item.insert("updatedAt".to_string(), attributes::string(&self.updated_at));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self, BoxError> {
        Ok(Self {
            id: attributes::require_string(item, "id")?,
            user_id: attributes::get_string(item, "userId").unwrap_or_default(),
            title: attributes::get_string(item, "title").unwrap_or_default(),
            memo: attributes::get_string(item, "memo").unwrap_or_default(),
            image_urls: attributes::get_string_list(item, "imageUrls"),
            voice_memo_urls: attributes::get_string_list(item, "voiceMemoUrls"),
            is_favorite: attributes::get_bool(item, "isFavorite").unwrap_or(false),
            password: attributes::get_string(item, "password").filter(|p| !p.is_empty()),
            expires_at: attributes::get_string(item, "expiresAt").filter(|e| !e.is_empty()),
            labels: attributes::get_string_list(item, "labels"),
            status: attributes::get_string(item, "status"),
            created_at: attributes::get_string(item, "createdAt").unwrap_or_default(),
            updated_at: attributes::get_string(item, "updatedAt").unwrap_or_default(),
        })
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn has_files(&self) -> bool {
        !self.image_urls.is_empty() || !self.voice_memo_urls.is_empty()
    }

    /// Image URLs followed by voice memo URLs
    pub fn file_urls(&self) -> impl Iterator<Item = &String> {
        self.image_urls.iter().chain(self.voice_memo_urls.iter())
    }

    pub fn expiration_status(&self, now: DateTime<Utc>) -> ExpirationStatus {
        ExpirationStatus::evaluate(self.expires_at.as_deref(), now)
    }

    /// JSON for unauthenticated callers: the password is replaced by a flag
    pub fn public_view(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("password");
            map.insert("hasPassword".to_string(), Value::Bool(self.has_password()));
        }
        value
    }
}

/// Local date-time layouts sent by `datetime-local` inputs, read as UTC
const NAIVE_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses RFC 3339 timestamps, zone-less date-times and bare `YYYY-MM-DD`
/// dates (UTC midnight)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationStatus {
    pub is_expired: bool,
    pub expires_at: Option<String>,
    pub days_until_expiration: Option<i64>,
}

impl ExpirationStatus {
    pub fn evaluate(expires_at: Option<&str>, now: DateTime<Utc>) -> Self {
        let deadline = expires_at.and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(expires_at = raw, "Ignoring unparseable expiration");
            }
            parsed
        });

        match deadline {
            Some(deadline) => {
                let remaining_ms = (deadline - now).num_milliseconds() as f64;
                let day_ms = (SECONDS_PER_DAY * 1000) as f64;
                Self {
                    is_expired: now > deadline,
                    expires_at: expires_at.map(str::to_string),
                    days_until_expiration: Some((remaining_ms / day_ms).ceil() as i64),
                }
            }
            None => Self {
                is_expired: false,
                expires_at: expires_at.map(str::to_string),
                days_until_expiration: None,
            },
        }
    }

    pub fn message(&self) -> &'static str {
        if self.is_expired {
            "This box has expired"
        } else {
            "Box is still valid"
        }
    }
}

/// Aggregate counters for the admin export
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub with_password: usize,
    pub with_files: usize,
}

impl BoxStats {
    pub fn collect(boxes: &[BoxRecord], now: DateTime<Utc>) -> Self {
        boxes.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            if record.expiration_status(now).is_expired {
                stats.expired += 1;
            } else {
                stats.active += 1;
            }
            if record.has_password() {
                stats.with_password += 1;
            }
            if record.has_files() {
                stats.with_files += 1;
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample() -> BoxRecord {
        BoxRecord::builder()
            .id("box-1")
            .user_id("3f2a-user")
            .title("Camping gear")
            .image_urls(vec!["https://b.s3.amazonaws.com/boxes/box-1/a.jpg".to_string()])
            .password("secret")
            .created_at("2025-01-01T00:00:00.000Z")
            .updated_at("2025-01-01T00:00:00.000Z")
            .build()
    }

    #[test]
    fn test_item_roundtrip_keeps_optional_fields() {
        let record = sample();
        let item = record.to_item();
        assert_eq!(
            item.get("expiresAt"),
            Some(&aws_sdk_dynamodb::types::AttributeValue::Null(true))
        );
        assert!(!item.contains_key("status"));
        assert_eq!(BoxRecord::from_item(&item).unwrap(), record);
    }

    #[test]
    fn test_create_applies_defaults() {
        let draft = BoxDraft {
            title: Some("Winter clothes".to_string()),
            password: Some(String::new()),
            ..Default::default()
        };
        let record = BoxRecord::create("box-2", "user-9", &draft, now());
        assert_eq!(record.title, "Winter clothes");
        assert_eq!(record.memo, "");
        assert!(record.password.is_none());
        assert!(!record.is_favorite);
        assert_eq!(record.created_at, "2025-06-01T12:00:00.000Z");
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_apply_keeps_owner_and_creation_time() {
        let mut record = sample();
        let draft = BoxDraft {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        record.apply(&draft, now());
        assert_eq!(record.user_id, "3f2a-user");
        assert_eq!(record.created_at, "2025-01-01T00:00:00.000Z");
        assert_eq!(record.title, "Renamed");
        assert!(record.password.is_none());
        assert!(record.image_urls.is_empty());
    }

    #[test]
    fn test_public_view_hides_password() {
        let view = sample().public_view();
        assert!(view.get("password").is_none());
        assert_eq!(view["hasPassword"], true);
        assert_eq!(view["userId"], "3f2a-user");
        assert_eq!(view["imageUrls"][0], "https://b.s3.amazonaws.com/boxes/box-1/a.jpg");
    }

    #[test]
    fn test_expiration_in_future() {
        let status = ExpirationStatus::evaluate(Some("2025-06-03T00:00:00Z"), now());
        assert!(!status.is_expired);
        assert_eq!(status.days_until_expiration, Some(2));
        assert_eq!(status.message(), "Box is still valid");
    }

    #[test]
    fn test_expiration_in_past() {
        let status = ExpirationStatus::evaluate(Some("2025-05-30"), now());
        assert!(status.is_expired);
        assert_eq!(status.days_until_expiration, Some(-2));
        assert_eq!(status.message(), "This box has expired");
    }

    #[test]
    fn test_expiration_without_time_zone_is_utc() {
        let status = ExpirationStatus::evaluate(Some("2025-05-30T10:00"), now());
        assert!(status.is_expired);
        assert_eq!(status.days_until_expiration, Some(-2));

        let status = ExpirationStatus::evaluate(Some("2025-05-30T10:00:00"), now());
        assert!(status.is_expired);

        let status = ExpirationStatus::evaluate(Some("2025-06-02T18:30:00.250"), now());
        assert!(!status.is_expired);
        assert_eq!(status.days_until_expiration, Some(2));

        assert_eq!(
            parse_timestamp("2025-05-30T10:00"),
            Some(Utc.with_ymd_and_hms(2025, 5, 30, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_or_invalid_expiration() {
        let status = ExpirationStatus::evaluate(None, now());
        assert!(!status.is_expired);
        assert_eq!(status.days_until_expiration, None);

        let status = ExpirationStatus::evaluate(Some("next tuesday"), now());
        assert!(!status.is_expired);
        assert_eq!(status.expires_at.as_deref(), Some("next tuesday"));
        assert_eq!(status.days_until_expiration, None);
    }

    #[test]
    fn test_stats() {
        let mut expired = sample();
        expired.expires_at = Some("2024-12-31T00:00:00Z".to_string());
        expired.image_urls.clear();

        let mut plain = sample();
        plain.password = None;
        plain.voice_memo_urls = vec!["https://b.s3.amazonaws.com/v.m4a".to_string()];

        let mut expired_local = sample();
        expired_local.expires_at = Some("2025-05-31T23:59".to_string());

        let stats = BoxStats::collect(&[sample(), expired, plain, expired_local], now());
        assert_eq!(
            stats,
            BoxStats {
                total: 4,
                active: 2,
                expired: 2,
                with_password: 3,
                with_files: 3,
            }
        );
    }
}
