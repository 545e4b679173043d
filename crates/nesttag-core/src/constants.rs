/// Application constants
///
/// This module contains all hardcoded values used throughout the service.
/// Constants are organized by category for easy maintenance.
// ============================================================================
// Authorization
// ============================================================================
/// Group whose members may call admin endpoints
pub const DEFAULT_ADMIN_GROUP: &str = "admins";

/// Group names accepted as "admin" when signing in to the admin console
pub const ADMIN_GROUP_ALIASES: &[&str] = &["admin", "admins"];

/// Prefix of the Authorization header value
pub const BEARER_PREFIX: &str = "Bearer ";

/// Header carrying the caller's user id for box registration
pub const USER_ID_HEADER: &str = "x-user-id";

// ============================================================================
// Timing Constants
// ============================================================================

/// Presigned upload/download URL lifetime in seconds (1 hour)
pub const PRESIGNED_URL_EXPIRATION_SECONDS: u64 = 60 * 60;

/// Seconds in one day, used for expiration arithmetic
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// ============================================================================
// DynamoDB
// ============================================================================

/// Global secondary index on `userId` shared by the boxes and labels tables
pub const USER_ID_INDEX: &str = "userId-index";

/// Maximum number of put requests per BatchWriteItem call
pub const BATCH_WRITE_LIMIT: usize = 25;

// ============================================================================
// Labels
// ============================================================================

/// Color assigned to labels created without one
pub const DEFAULT_LABEL_COLOR: &str = "#0366d6";

/// Prefix of user-created label ids
pub const LABEL_ID_PREFIX: &str = "custom";

// ============================================================================
// Object Storage
// ============================================================================

/// Key prefix for uploaded box files
pub const BOX_FILES_PREFIX: &str = "boxes";

/// Object metadata key holding the owning box id
pub const METADATA_BOX_ID: &str = "box-id";

/// Object metadata key holding the client-side file name
pub const METADATA_ORIGINAL_NAME: &str = "original-name";

/// Maximum filename length
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum request body accepted by API Gateway (10 MB)
pub const MAX_BODY_SIZE_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// CORS
// ============================================================================

pub const CORS_ALLOW_HEADERS: &str = "Content-Type, X-Amz-Date, Authorization, X-Api-Key, X-Amz-Security-Token, X-Amz-User-Agent, X-User-Id";

pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Preflight cache lifetime in seconds
pub const CORS_MAX_AGE_SECS: u64 = 86_400;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_limit_matches_dynamodb() {
        assert_eq!(BATCH_WRITE_LIMIT, 25);
    }

    #[test]
    fn test_cors_headers_include_auth_and_user_id() {
        assert!(CORS_ALLOW_HEADERS.contains("Authorization"));
        assert!(CORS_ALLOW_HEADERS.contains("X-User-Id"));
        assert!(CORS_ALLOW_METHODS.contains("OPTIONS"));
    }

    #[test]
    fn test_admin_aliases_contain_default_group() {
        assert!(ADMIN_GROUP_ALIASES.contains(&DEFAULT_ADMIN_GROUP));
    }
}
