/// Log-safe renderings of user emails and object keys
use regex::Regex;

lazy_static::lazy_static! {
    // Group 1 is the `@domain` part that stays visible
    static ref EMAIL_ADDRESS: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+(@[A-Za-z0-9.-]+\.[A-Za-z]{2,})\b").unwrap();
}

/// Hides the local part of every email address in `text`
///
/// Usernames in the pool are email addresses, so anything logged next to a
/// user goes through here first.
///
/// # Examples
/// ```
/// use nesttag_core::utils::logging::mask_email;
///
/// assert_eq!(mask_email("hanako@nest-tag.com"), "***@nest-tag.com");
/// ```
pub fn mask_email(text: &str) -> String {
    EMAIL_ADDRESS.replace_all(text, "***$1").into_owned()
}

/// Keeps only the file segment of an object key (`boxes/<id>/` is dropped)
pub fn key_for_log(key: &str) -> String {
    match key.rsplit_once('/').map_or(key, |(_, file)| file) {
        "" => "...".to_string(),
        file => format!(".../{}", file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("admin@nest-tag.com"), "***@nest-tag.com");
        assert_eq!(
            mask_email("from a@foo.com to b.c+d@bar.co.jp"),
            "from ***@foo.com to ***@bar.co.jp"
        );
        assert_eq!(mask_email("box-owner-3f2a"), "box-owner-3f2a");
    }

    #[test]
    fn test_key_for_log() {
        assert_eq!(
            key_for_log("boxes/NT-1/1700000000000-a.jpg"),
            ".../1700000000000-a.jpg"
        );
        assert_eq!(key_for_log("a.jpg"), ".../a.jpg");
        assert_eq!(key_for_log(""), "...");
        assert_eq!(key_for_log("boxes/"), "...");
    }
}
