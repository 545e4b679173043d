/// Data models stored in DynamoDB or returned by the identity provider
pub mod attributes;
pub mod box_id;
pub mod box_record;
pub mod label;
pub mod user;

pub use box_id::BoxIdRecord;
pub use box_record::{BoxDraft, BoxRecord, BoxStats, ExpirationStatus};
pub use label::Label;
pub use user::{AdminUser, AuthTokens, UserProfile};

use chrono::{DateTime, SecondsFormat, Utc};

/// ISO-8601 timestamp with millisecond precision, as stored in every table
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
