/// Admin console endpoints for sign-in and box management
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use nesttag_core::{
    constants::{ADMIN_GROUP_ALIASES, PRESIGNED_URL_EXPIRATION_SECONDS},
    models::{BoxRecord, BoxStats, timestamp},
    utils::{key_for_log, mask_email, s3_url},
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{context::ApiContext, error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
pub struct AdminAuthRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthResponse {
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub user: AdminSession,
}

#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub email: String,
    pub role: &'static str,
    pub groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BoxOwner {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Full box record, password included, with its owner's contact details
#[derive(Debug, Serialize)]
pub struct AdminBox {
    #[serde(flatten)]
    pub record: BoxRecord,
    pub owner: Option<BoxOwner>,
}

#[derive(Debug, Serialize)]
pub struct AdminBoxesResponse {
    pub boxes: Vec<AdminBox>,
}

#[derive(Debug, Serialize)]
pub struct DeleteBoxResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePresignedRequest {
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePresignedResponse {
    pub presigned_url: String,
    pub original_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub export_date: String,
    pub stats: BoxStats,
    pub boxes: Vec<BoxRecord>,
}

/// Password sign-in restricted to members of an admin group
pub async fn auth(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<AdminAuthRequest>,
) -> Result<Json<AdminAuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let Some(tokens) = ctx.identity.admin_initiate_auth(email, password).await? else {
        warn!(email = %mask_email(email), "Admin sign-in requires an additional challenge");
        return Err(ApiError::Unauthorized("Authentication failed".to_string()));
    };

    let groups = ctx.identity.admin_list_groups_for_user(email).await?;
    if !groups
        .iter()
        .any(|group| ADMIN_GROUP_ALIASES.contains(&group.as_str()))
    {
        warn!(email = %mask_email(email), "Sign-in without admin group membership");
        return Err(ApiError::Forbidden(
            "Administrator privileges required".to_string(),
        ));
    }

    info!(email = %mask_email(email), "Admin signed in");

    Ok(Json(AdminAuthResponse {
        token: tokens.id_token,
        access_token: tokens.access_token,
        user: AdminSession {
            email: email.to_string(),
            role: "admin",
            groups,
        },
    }))
}

async fn owner_of(ctx: &ApiContext, user_id: &str) -> Option<BoxOwner> {
    if user_id.is_empty() {
        return None;
    }

    match ctx.identity.admin_get_user(user_id).await {
        Ok(profile) => Some(BoxOwner {
            email: profile.email,
            name: profile.name,
        }),
        Err(e) => {
            warn!(error = %e, "Failed to look up box owner");
            None
        }
    }
}

/// Every box with its owner
pub async fn list_boxes(
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<AdminBoxesResponse>, ApiError> {
    let records = ctx.boxes.scan().await?;

    let owners = join_all(records.iter().map(|r| owner_of(&ctx, &r.user_id))).await;
    let boxes = records
        .into_iter()
        .zip(owners)
        .map(|(record, owner)| AdminBox { record, owner })
        .collect();

    Ok(Json(AdminBoxesResponse { boxes }))
}

/// Deletes a box together with the stored files it references
pub async fn delete_box(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteBoxResponse>, ApiError> {
    let record = ctx
        .boxes
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Box not found".to_string()))?;

    let keys: Vec<String> = record
        .file_urls()
        .filter_map(|url| s3_url::parse(url))
        .filter(|location| location.bucket == ctx.config.bucket)
        .map(|location| location.key)
        .collect();

    if !keys.is_empty() {
        // File cleanup is best effort; the record goes regardless
        if let Err(e) = ctx.storage.delete_objects(&ctx.config.bucket, &keys).await {
            warn!(box_id = %id, error = %e, "Failed to delete box files");
        }
    }

    ctx.boxes.delete(&id).await?;
    info!(box_id = %id, files = keys.len(), "Box deleted by admin");

    Ok(Json(DeleteBoxResponse {
        success: true,
        message: format!("Box {} has been deleted successfully", id),
    }))
}

/// Time-limited download link for a stored file, via the CDN when configured
pub async fn file_presigned(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<FilePresignedRequest>,
) -> Result<Json<FilePresignedResponse>, ApiError> {
    let file_url = request
        .file_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("fileUrl is required".to_string()))?;

    let location = s3_url::parse(&file_url)
        .ok_or_else(|| ApiError::BadRequest("Invalid S3 URL".to_string()))?;

    if let Some(cdn) = &ctx.cdn {
        let expires_at =
            Utc::now() + ChronoDuration::seconds(PRESIGNED_URL_EXPIRATION_SECONDS as i64);
        match cdn.sign_url(&location.key, expires_at) {
            Ok(presigned_url) => {
                return Ok(Json(FilePresignedResponse {
                    presigned_url,
                    original_url: file_url,
                }));
            }
            Err(e) => warn!(error = %e, "CDN signing failed, falling back to S3"),
        }
    }

    let presigned_url = ctx
        .storage
        .presign_download(
            &location.bucket,
            &location.key,
            Duration::from_secs(PRESIGNED_URL_EXPIRATION_SECONDS),
        )
        .await?;
    info!(key = %key_for_log(&location.key), "Issued presigned download URL");

    Ok(Json(FilePresignedResponse {
        presigned_url,
        original_url: file_url,
    }))
}

/// Snapshot of all boxes with aggregate counters
pub async fn export(State(ctx): State<Arc<ApiContext>>) -> Result<Json<ExportResponse>, ApiError> {
    let now = Utc::now();
    let boxes = ctx.boxes.scan().await?;
    let stats = BoxStats::collect(&boxes, now);
    info!(total = stats.total, "Exported box data");

    Ok(Json(ExportResponse {
        export_date: timestamp(now),
        stats,
        boxes,
    }))
}
