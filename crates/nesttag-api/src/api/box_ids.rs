/// Admin endpoints for the box ID registry
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use nesttag_core::{
    constants::BATCH_WRITE_LIMIT,
    models::BoxIdRecord,
    utils::{csv::parse_box_ids, sanitization::validate_box_id},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{context::ApiContext, error::ApiError, extract::JsonBody};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxIdsResponse {
    pub box_ids: Vec<BoxIdRecord>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoxIdRequest {
    pub box_id: Option<String>,
    pub activation_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoxIdResponse {
    pub message: String,
    pub box_id: String,
    pub activation_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBoxIdsRequest {
    pub csv_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadBoxIdsResponse {
    pub message: String,
    pub total: usize,
    pub success: usize,
    pub errors: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBoxIdResponse {
    pub message: String,
    pub box_id: String,
}

pub async fn list(State(ctx): State<Arc<ApiContext>>) -> Result<Json<BoxIdsResponse>, ApiError> {
    let box_ids = ctx.box_ids.list().await?;

    Ok(Json(BoxIdsResponse {
        total: box_ids.len(),
        box_ids,
    }))
}

pub async fn create(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<CreateBoxIdRequest>,
) -> Result<Json<CreateBoxIdResponse>, ApiError> {
    let (Some(box_id), Some(activation_date)) = (
        request.box_id.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        request
            .activation_date
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "boxId and activationDate are required".to_string(),
        ));
    };
    validate_box_id(box_id).map_err(ApiError::BadRequest)?;

    let record = BoxIdRecord::new(box_id, activation_date, Utc::now());
    ctx.box_ids.put(&record).await?;
    info!(box_id = %box_id, "Box ID registered");

    Ok(Json(CreateBoxIdResponse {
        message: "Box ID created successfully".to_string(),
        box_id: record.box_id,
        activation_date: record.activation_date,
    }))
}

/// Registers every valid row of an uploaded CSV list
pub async fn upload(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<UploadBoxIdsRequest>,
) -> Result<Json<UploadBoxIdsResponse>, ApiError> {
    let content = request
        .csv_content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("csvContent is required".to_string()))?;

    let now = Utc::now();
    let records: Vec<BoxIdRecord> = parse_box_ids(&content)
        .iter()
        .map(|row| BoxIdRecord::new(&row.box_id, &row.activation_date, now))
        .collect();

    if records.is_empty() {
        return Err(ApiError::BadRequest(
            "No valid box ID rows found".to_string(),
        ));
    }

    let mut success = 0;
    let mut errors = 0;
    for batch in records.chunks(BATCH_WRITE_LIMIT) {
        match ctx.box_ids.put_batch(batch).await {
            Ok(unprocessed) => {
                success += batch.len() - unprocessed;
                errors += unprocessed;
            }
            Err(e) => {
                warn!(error = %e, size = batch.len(), "Box ID batch write failed");
                errors += batch.len();
            }
        }
    }

    info!(total = records.len(), success, errors, "Box ID list uploaded");

    Ok(Json(UploadBoxIdsResponse {
        message: "Box ID upload completed".to_string(),
        total: records.len(),
        success,
        errors,
    }))
}

pub async fn delete(
    State(ctx): State<Arc<ApiContext>>,
    Path(box_id): Path<String>,
) -> Result<Json<DeleteBoxIdResponse>, ApiError> {
    ctx.box_ids.delete(&box_id).await?;
    info!(box_id = %box_id, "Box ID deleted");

    Ok(Json(DeleteBoxIdResponse {
        message: "Box ID deleted successfully".to_string(),
        box_id,
    }))
}
