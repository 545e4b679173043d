/// Locating objects from their public S3 URLs
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

/// Splits a virtual-hosted style URL into bucket and decoded key
///
/// Keys that were percent-encoded twice on upload are decoded twice.
pub fn parse(file_url: &str) -> Option<S3Location> {
    let url = Url::parse(file_url).ok()?;
    let bucket = url.host_str()?.split('.').next()?.to_string();
    if bucket.is_empty() {
        return None;
    }

    let raw = url.path().trim_start_matches('/');
    let key = urlencoding::decode(raw).ok()?.into_owned();
    let key = match urlencoding::decode(&key) {
        Ok(twice) if twice != key => twice.into_owned(),
        _ => key,
    };

    if key.is_empty() {
        return None;
    }

    Some(S3Location { bucket, key })
}
