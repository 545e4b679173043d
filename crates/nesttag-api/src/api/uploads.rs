/// File upload endpoints
use axum::{Json, extract::State};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use nesttag_core::{
    constants::{
        BOX_FILES_PREFIX, METADATA_BOX_ID, METADATA_ORIGINAL_NAME,
        PRESIGNED_URL_EXPIRATION_SECONDS,
    },
    utils::{key_for_log, sanitize_file_name, validate_box_id},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::info;

use crate::{context::ApiContext, error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub box_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_data: Option<String>,
    pub box_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub file_key: String,
    pub bucket: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub message: String,
    pub file_url: String,
    pub file_key: String,
}

/// Validated target of an upload
struct UploadTarget {
    key: String,
    content_type: String,
    metadata: HashMap<String, String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds `boxes/<boxId>/<epoch millis>-<file name>` and the object metadata
fn upload_target(box_id: &str, file_name: &str, file_type: &str) -> Result<UploadTarget, ApiError> {
    validate_box_id(box_id).map_err(ApiError::BadRequest)?;

    let safe_name = sanitize_file_name(file_name);
    if safe_name.is_empty() {
        return Err(ApiError::BadRequest("Invalid file name".to_string()));
    }

    // Signed as received: the client must PUT with the identical header
    file_type
        .parse::<mime::Mime>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid file type: {}", file_type)))?;

    let key = format!(
        "{}/{}/{}-{}",
        BOX_FILES_PREFIX,
        box_id,
        Utc::now().timestamp_millis(),
        safe_name
    );

    let metadata = HashMap::from([
        (METADATA_BOX_ID.to_string(), box_id.to_string()),
        // Metadata values must be ASCII
        (
            METADATA_ORIGINAL_NAME.to_string(),
            urlencoding::encode(file_name).into_owned(),
        ),
    ]);

    Ok(UploadTarget {
        key,
        content_type: file_type.to_string(),
        metadata,
    })
}

/// Issues a presigned PUT URL for direct upload from the client
pub async fn presigned(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let (Some(file_name), Some(file_type), Some(box_id)) = (
        non_empty(&request.file_name),
        non_empty(&request.file_type),
        non_empty(&request.box_id),
    ) else {
        return Err(ApiError::BadRequest(
            "fileName, fileType, and boxId are required".to_string(),
        ));
    };

    let target = upload_target(box_id, file_name, file_type)?;

    let upload_url = ctx
        .storage
        .presign_upload(
            &ctx.config.bucket,
            &target.key,
            &target.content_type,
            target.metadata,
            Duration::from_secs(PRESIGNED_URL_EXPIRATION_SECONDS),
        )
        .await?;

    info!(
        key = %key_for_log(&target.key),
        "Issued presigned upload URL"
    );

    Ok(Json(UploadUrlResponse {
        upload_url,
        file_key: target.key,
        bucket: ctx.config.bucket.clone(),
    }))
}

/// Stores a base64-encoded file sent in the request body
pub async fn upload(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<UploadFileRequest>,
) -> Result<Json<UploadFileResponse>, ApiError> {
    let (Some(file_name), Some(file_type), Some(file_data), Some(box_id)) = (
        non_empty(&request.file_name),
        non_empty(&request.file_type),
        non_empty(&request.file_data),
        non_empty(&request.box_id),
    ) else {
        return Err(ApiError::BadRequest(
            "fileName, fileType, fileData, and boxId are required".to_string(),
        ));
    };

    let target = upload_target(box_id, file_name, file_type)?;

    let data = STANDARD
        .decode(file_data)
        .map_err(|e| ApiError::BadRequest(format!("fileData is not valid base64: {}", e)))?;
    let size = data.len();

    let file_url = ctx
        .storage
        .put_object(
            &ctx.config.bucket,
            &target.key,
            data,
            &target.content_type,
            target.metadata,
        )
        .await?;

    info!(
        key = %key_for_log(&target.key),
        size = size,
        "File uploaded"
    );

    Ok(Json(UploadFileResponse {
        message: "File uploaded successfully".to_string(),
        file_url,
        file_key: target.key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_target_key_layout() {
        let target = upload_target("box-1", "my photo.jpg", "image/jpeg").unwrap();
        assert!(target.key.starts_with("boxes/box-1/"));
        assert!(target.key.ends_with("-myphoto.jpg"));
        assert_eq!(target.content_type, "image/jpeg");
        assert_eq!(target.metadata[METADATA_BOX_ID], "box-1");
        assert_eq!(target.metadata[METADATA_ORIGINAL_NAME], "my%20photo.jpg");
    }

    #[test]
    fn test_upload_target_keeps_client_values() {
        let target = upload_target("box-1", "日記 (1).txt", "text/plain; charset=utf-8").unwrap();
        assert_eq!(target.content_type, "text/plain; charset=utf-8");
        assert_eq!(
            target.metadata[METADATA_ORIGINAL_NAME],
            "%E6%97%A5%E8%A8%98%20%281%29.txt"
        );
    }

    #[test]
    fn test_upload_target_rejects_bad_input() {
        assert!(upload_target("../etc", "a.jpg", "image/jpeg").is_err());
        assert!(upload_target("box-1", "...", "image/jpeg").is_err());
        assert!(upload_target("box-1", "a.jpg", "not a mime").is_err());
    }
}
