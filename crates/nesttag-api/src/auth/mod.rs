/// Route guards backed by the shared [`Authenticator`](nesttag_core::auth::Authenticator)
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use nesttag_core::auth::Access;
use std::sync::Arc;

use crate::{context::ApiContext, error::ApiError};

/// Requires a valid, unexpired bearer token
pub async fn require_user(
    State(ctx): State<Arc<ApiContext>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(ctx, Access::User, request, next).await
}

/// Requires a valid bearer token whose holder belongs to the admin group
pub async fn require_admin(
    State(ctx): State<Arc<ApiContext>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(ctx, Access::Admin, request, next).await
}

async fn authorize(
    ctx: Arc<ApiContext>,
    access: Access,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let identity = ctx
        .authenticator
        .authenticate(auth_header.as_deref(), access, Utc::now())
        .await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
