/// Account self-service endpoints
use axum::{Json, extract::State};
use nesttag_core::utils::mask_email;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{
    api::{MessageResponse, message},
    context::ApiContext,
    error::ApiError,
    extract::JsonBody,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmForgotPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub new_password: Option<String>,
}

/// Completes a password reset with the emailed verification code
pub async fn confirm_forgot_password(
    State(ctx): State<Arc<ApiContext>>,
    JsonBody(request): JsonBody<ConfirmForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(email), Some(code), Some(new_password)) = (
        request.email.as_deref().filter(|v| !v.trim().is_empty()),
        request.code.as_deref().filter(|v| !v.trim().is_empty()),
        request.new_password.as_deref().filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email, code, and new password are required".to_string(),
        ));
    };

    if ctx.config.is_development() {
        info!(email = %mask_email(email), "Skipping password reset in development mode");
        return Ok(message("Password reset successful (Development mode)"));
    }

    ctx.identity
        .confirm_forgot_password(email.trim(), code.trim(), new_password)
        .await?;
    info!(email = %mask_email(email), "Password reset confirmed");

    Ok(message("Password reset successful"))
}
