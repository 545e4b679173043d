/// Checks for client input that becomes part of an object key
use crate::constants::MAX_FILENAME_LENGTH;

/// Longest box ID accepted as a key segment (S3 keys stop at 1024 bytes)
const MAX_BOX_ID_BYTES: usize = 1024;

/// Reduces an uploaded file name to a single key segment
///
/// Letters and digits of any script survive, along with `-`, `_`, `.` and
/// `@`. Dot runs shrink to one dot and edge dots are dropped, so the result
/// can never climb out of `boxes/<boxId>/`.
///
/// # Examples
/// ```
/// use nesttag_core::utils::sanitization::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("IMG 2031 (1).HEIC"), "IMG20311.HEIC");
/// assert_eq!(sanitize_file_name("../../boxes/other/a.jpg"), "boxesothera.jpg");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        .take(MAX_FILENAME_LENGTH)
    {
        if c == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(c);
    }
    cleaned.trim_matches('.').to_string()
}

/// Rejects box IDs that would not map to exactly one key segment
pub fn validate_box_id(box_id: &str) -> Result<(), String> {
    let problem = if box_id.is_empty() {
        "is empty"
    } else if box_id.contains("..") {
        "must not contain '..'"
    } else if box_id.contains(['/', '\\']) {
        "must not contain path separators"
    } else if box_id.chars().any(char::is_control) {
        "must not contain control characters"
    } else if box_id.len() > MAX_BOX_ID_BYTES {
        "is too long"
    } else {
        return Ok(());
    };

    Err(format!("Box ID {}", problem))
}
