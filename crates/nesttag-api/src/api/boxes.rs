/// Public box endpoints
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use nesttag_core::{
    constants::USER_ID_HEADER,
    models::{BoxDraft, BoxRecord, user::user_id_prefix},
    utils::{require, sanitization::validate_box_id},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{context::ApiContext, error::ApiError, extract::JsonBody};

#[derive(Debug, Serialize)]
pub struct BoxResponse {
    #[serde(rename = "box")]
    pub record: Value,
}

#[derive(Debug, Serialize)]
pub struct BoxMessageResponse {
    pub message: String,
    #[serde(rename = "box")]
    pub record: Value,
}

#[derive(Debug, Serialize)]
pub struct BoxStatusResponse {
    pub exists: bool,
    pub status: &'static str,
    #[serde(rename = "box")]
    pub record: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationResponse {
    pub is_expired: bool,
    pub expires_at: Option<String>,
    pub days_until_expiration: Option<i64>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserBoxesResponse {
    pub boxes: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub user_id: Option<String>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBoxesQuery {
    pub user_id: Option<String>,
}

async fn load(ctx: &ApiContext, id: &str) -> Result<BoxRecord, ApiError> {
    ctx.boxes
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Box not found".to_string()))
}

/// Display name of a box owner, falling back to the user id prefix
async fn owner_name(ctx: &ApiContext, user_id: &str) -> String {
    if ctx.config.is_development() {
        return user_id_prefix(user_id);
    }

    match ctx.identity.admin_get_user(user_id).await {
        Ok(profile) => profile.display_name(),
        Err(e) => {
            warn!(error = %e, "Failed to resolve box owner name");
            user_id_prefix(user_id)
        }
    }
}

pub async fn get(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<BoxResponse>, ApiError> {
    let record = load(&ctx, &id).await?;

    let mut view = record.public_view();
    if let Value::Object(map) = &mut view {
        map.insert(
            "userName".to_string(),
            Value::String(owner_name(&ctx, &record.user_id).await),
        );
    }

    Ok(Json(BoxResponse { record: view }))
}

/// Creates a box or, for its owner, replaces its contents
pub async fn register(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(draft): JsonBody<BoxDraft>,
) -> Result<(StatusCode, Json<BoxResponse>), ApiError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("User ID is required".to_string()))?
        .to_string();

    require(draft.title.as_deref(), "title")?;
    validate_box_id(&id).map_err(ApiError::BadRequest)?;

    let now = Utc::now();

    if let Some(existing) = ctx.boxes.get(&id).await? {
        if existing.user_id != user_id {
            return Err(ApiError::Forbidden(
                "You can only update boxes you created".to_string(),
            ));
        }

        let updated = ctx.boxes.update_content(&id, &draft, now).await?;
        info!(box_id = %id, "Box updated");
        return Ok((
            StatusCode::OK,
            Json(BoxResponse {
                record: updated.public_view(),
            }),
        ));
    }

    if ctx.config.require_registered_box_id {
        let claimable = ctx
            .box_ids
            .get(&id)
            .await?
            .is_some_and(|entry| entry.is_claimable(now));
        if !claimable {
            return Err(ApiError::BadRequest(
                "This box ID is not registered or is no longer active".to_string(),
            ));
        }
    }

    let record = BoxRecord::create(&id, &user_id, &draft, now);
    ctx.boxes.put(&record).await?;
    info!(box_id = %id, "Box created");

    Ok((
        StatusCode::CREATED,
        Json(BoxResponse {
            record: record.public_view(),
        }),
    ))
}

pub async fn status(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<BoxStatusResponse>, ApiError> {
    let record = ctx.boxes.get(&id).await?;

    Ok(Json(BoxStatusResponse {
        exists: record.is_some(),
        status: if record.is_some() {
            "registered"
        } else {
            "unregistered"
        },
        record: record.map(|r| r.public_view()),
    }))
}

pub async fn expiration(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<ExpirationResponse>, ApiError> {
    let record = load(&ctx, &id).await?;
    let status = record.expiration_status(Utc::now());

    Ok(Json(ExpirationResponse {
        message: status.message(),
        is_expired: status.is_expired,
        expires_at: status.expires_at,
        days_until_expiration: status.days_until_expiration,
    }))
}

pub async fn check_password(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<PasswordRequest>,
) -> Result<Json<BoxMessageResponse>, ApiError> {
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?;

    let record = load(&ctx, &id).await?;

    match record.password.as_deref() {
        None => Err(ApiError::BadRequest(
            "This box is not password protected".to_string(),
        )),
        Some(stored) if stored != password => {
            Err(ApiError::Unauthorized("Incorrect password".to_string()))
        }
        Some(_) => Ok(Json(BoxMessageResponse {
            message: "Password is correct".to_string(),
            record: record.public_view(),
        })),
    }
}

/// Sets the favorite flag, or flips it when `isFavorite` is omitted
pub async fn toggle_favorite(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<FavoriteRequest>,
) -> Result<Json<BoxMessageResponse>, ApiError> {
    let user_id = require(request.user_id.as_deref(), "userId")
        .map_err(|_| ApiError::BadRequest("User ID is required".to_string()))?;

    let record = load(&ctx, &id).await?;
    if record.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only toggle favorite for boxes you created".to_string(),
        ));
    }

    let is_favorite = request.is_favorite.unwrap_or(!record.is_favorite);
    let updated = ctx.boxes.set_favorite(&id, is_favorite, Utc::now()).await?;

    Ok(Json(BoxMessageResponse {
        message: "Favorite status updated successfully".to_string(),
        record: updated.public_view(),
    }))
}

pub async fn list_for_user(
    State(ctx): State<Arc<ApiContext>>,
    Query(query): Query<UserBoxesQuery>,
) -> Result<Json<UserBoxesResponse>, ApiError> {
    let user_id = require(query.user_id.as_deref(), "userId")
        .map_err(|_| ApiError::BadRequest("User ID is required".to_string()))?;

    let boxes: Vec<Value> = ctx
        .boxes
        .list_for_user(user_id)
        .await?
        .iter()
        .map(BoxRecord::public_view)
        .collect();

    Ok(Json(UserBoxesResponse {
        count: boxes.len(),
        boxes,
    }))
}
