/// Admin user management endpoints
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use futures::future::join_all;
use nesttag_core::{
    auth::Identity,
    models::AdminUser,
    utils::{mask_email, validate_email_address},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{context::ApiContext, error::ApiError, extract::JsonBody};

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<AdminUser>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub group: Option<String>,
}

/// `group: ""` clears all memberships, a missing `group` leaves them alone
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub email: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Pool users with their group memberships
pub async fn list(State(ctx): State<Arc<ApiContext>>) -> Result<Json<UsersResponse>, ApiError> {
    let users = ctx.identity.list_users().await?;

    let groups = join_all(
        users
            .iter()
            .map(|user| ctx.identity.admin_list_groups_for_user(&user.username)),
    )
    .await;

    let users = users
        .into_iter()
        .zip(groups)
        .map(|(mut user, groups)| {
            user.groups = groups.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to list groups for user");
                Vec::new()
            });
            user
        })
        .collect();

    Ok(Json(UsersResponse { users }))
}

pub async fn create(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(&request.username),
        non_empty(&request.email),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Username, email, and password are required".to_string(),
        ));
    };
    validate_email_address(email)?;

    ctx.identity
        .admin_create_user(username, email, password)
        .await?;
    ctx.identity
        .admin_set_user_password(username, password)
        .await?;

    let group = non_empty(&request.group);
    if let Some(group) = group {
        ctx.identity.admin_add_user_to_group(username, group).await?;
    }

    info!(username = %mask_email(username), group = ?group, "User created");

    Ok(Json(UserResponse {
        success: true,
        message: "User created successfully".to_string(),
        user: UserSummary {
            username: username.to_string(),
            email: Some(email.to_string()),
            group: group.map(str::to_string),
        },
    }))
}

pub async fn update(
    State(ctx): State<Arc<ApiContext>>,
    Path(username): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let email = non_empty(&request.email);
    if let Some(email) = email {
        validate_email_address(email)?;
        ctx.identity
            .admin_update_user_attributes(&username, &[("email".to_string(), email.to_string())])
            .await?;
    }

    if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
        ctx.identity
            .admin_set_user_password(&username, password)
            .await?;
    }

    if let Some(group) = request.group.as_deref() {
        let group = group.trim();
        for current in ctx.identity.admin_list_groups_for_user(&username).await? {
            ctx.identity
                .admin_remove_user_from_group(&username, &current)
                .await?;
        }
        if !group.is_empty() {
            ctx.identity.admin_add_user_to_group(&username, group).await?;
        }
    }

    info!(username = %mask_email(&username), "User updated");

    Ok(Json(UserResponse {
        success: true,
        message: "User updated successfully".to_string(),
        user: UserSummary {
            email: email.map(str::to_string),
            group: request.group.clone(),
            username,
        },
    }))
}

pub async fn delete(
    State(ctx): State<Arc<ApiContext>>,
    Extension(identity): Extension<Identity>,
    Path(username): Path<String>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let is_self =
        identity.username == username || identity.email.as_deref() == Some(username.as_str());
    if is_self {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    ctx.identity.admin_delete_user(&username).await?;
    info!(username = %mask_email(&username), "User deleted");

    Ok(Json(DeleteUserResponse {
        success: true,
        message: "User deleted successfully".to_string(),
        username,
    }))
}
