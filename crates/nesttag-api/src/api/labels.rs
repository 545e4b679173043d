/// Label endpoints
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use nesttag_core::{BoxError, auth::Identity, models::Label, utils::require};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{
    api::{MessageResponse, message},
    context::ApiContext,
    error::ApiError,
    extract::JsonBody,
};

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    pub labels: Vec<Label>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub label: Label,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLabelRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// Labels owned by the authenticated caller
pub async fn list(
    State(ctx): State<Arc<ApiContext>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<LabelsResponse>, ApiError> {
    let labels = ctx.labels.list_for_user(&identity.sub).await?;

    Ok(Json(LabelsResponse {
        count: labels.len(),
        labels,
    }))
}

pub async fn create(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<CreateLabelRequest>,
) -> Result<(StatusCode, Json<LabelResponse>), ApiError> {
    let (Ok(name), Ok(user_id)) = (
        require(request.name.as_deref(), "name"),
        require(request.user_id.as_deref(), "userId"),
    ) else {
        return Err(ApiError::BadRequest(
            "Name and userId are required".to_string(),
        ));
    };

    let label = Label::new(
        user_id,
        name,
        request.color.as_deref(),
        request.description.as_deref(),
        Utc::now(),
    );
    ctx.labels.put(&label).await?;
    info!(label_id = %label.id, "Label created");

    Ok((StatusCode::CREATED, Json(LabelResponse { label })))
}

pub async fn update(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateLabelRequest>,
) -> Result<Json<LabelResponse>, ApiError> {
    let name = require(request.name.as_deref(), "name")?;

    let label = ctx
        .labels
        .update(
            &id,
            name,
            request.color.as_deref(),
            request.description.as_deref(),
            Utc::now(),
        )
        .await
        .map_err(|e| match e {
            BoxError::NotFound(_) => ApiError::NotFound("Label not found".to_string()),
            other => ApiError::from(other),
        })?;

    Ok(Json(LabelResponse { label }))
}

pub async fn delete(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ctx.labels.delete(&id).await?;
    info!(label_id = %id, "Label deleted");

    Ok(message("Label deleted successfully"))
}
