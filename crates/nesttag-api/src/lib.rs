/// NestTag API - box service Lambda
///
/// This crate contains the REST handlers for boxes, labels, uploads and the
/// admin console, served by a single axum router behind API Gateway.
pub mod api;
pub mod auth;
pub mod context;
pub mod error;
pub mod extract;
pub mod middleware;

pub use context::{ApiContext, Services};
pub use error::ApiError;

use axum::{
    Router,
    body::Body as AxumBody,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use lambda_http::{Body, Error as LambdaError, Request, Response};
use nesttag_core::constants::{
    CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_MAX_AGE_SECS, MAX_BODY_SIZE_BYTES,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::debug;

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Answers every `OPTIONS` request as a preflight, ahead of routing and auth
fn cors_layer() -> CorsLayer {
    let methods: Vec<Method> = CORS_ALLOW_METHODS
        .split(", ")
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();
    let headers: Vec<HeaderName> = CORS_ALLOW_HEADERS
        .split(", ")
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS))
}

/// Builds the application router
pub fn router(ctx: Arc<ApiContext>) -> Router {
    let user_auth = axum_middleware::from_fn_with_state(Arc::clone(&ctx), auth::require_user);
    let admin_auth = axum_middleware::from_fn_with_state(Arc::clone(&ctx), auth::require_admin);

    let public = Router::new()
        // Boxes
        .route("/boxes", get(api::boxes::list_for_user))
        .route(
            "/boxes/{id}",
            get(api::boxes::get).put(api::boxes::register),
        )
        .route("/boxes/{id}/status", get(api::boxes::status))
        .route("/boxes/{id}/expiration", get(api::boxes::expiration))
        .route("/boxes/{id}/password", post(api::boxes::check_password))
        .route("/boxes/{id}/favorite", post(api::boxes::toggle_favorite))
        // Labels; only listing needs a signed-in user
        .route(
            "/labels",
            get(api::labels::list)
                .route_layer(user_auth)
                .post(api::labels::create),
        )
        .route(
            "/labels/{id}",
            put(api::labels::update).delete(api::labels::delete),
        )
        // Uploads
        .route("/uploads/presigned", post(api::uploads::presigned))
        .route("/uploads", post(api::uploads::upload))
        // Account
        .route(
            "/auth/confirm-forgot-password",
            post(api::account::confirm_forgot_password),
        )
        .route("/admin/auth", post(api::admin::auth));

    let admin = Router::new()
        .route("/admin/boxes", get(api::admin::list_boxes))
        .route("/admin/boxes/{id}", delete(api::admin::delete_box))
        .route("/admin/files/presigned", post(api::admin::file_presigned))
        .route("/admin/export", get(api::admin::export))
        .route(
            "/admin/users",
            get(api::users::list).post(api::users::create),
        )
        .route(
            "/admin/users/{username}",
            put(api::users::update).delete(api::users::delete),
        )
        .route(
            "/admin/box-ids",
            get(api::box_ids::list).post(api::box_ids::create),
        )
        .route("/admin/box-ids/upload", post(api::box_ids::upload))
        .route("/admin/box-ids/{box_id}", delete(api::box_ids::delete))
        .route_layer(admin_auth);

    Router::new()
        .merge(public)
        .merge(admin)
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        // API Gateway rejects payloads above 10MB anyway
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(cors_layer())
        // Every response carries the full CORS envelope
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(CORS_MAX_AGE_SECS),
        ))
        .with_state(ctx)
}

/// Main API handler - converts Lambda HTTP request to Axum router
pub async fn handler(app: Router, event: Request) -> Result<Response<Body>, LambdaError> {
    debug!(method = %event.method(), path = %event.uri().path(), "Processing API request");

    // Base64-encoded API Gateway bodies arrive here already decoded
    let (parts, body) = event.into_parts();
    let axum_request = http::Request::from_parts(parts, AxumBody::from(body.to_vec()));

    let response = app.oneshot(axum_request).await?;

    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX).await?;

    Ok(Response::from_parts(parts, Body::from(body_bytes.to_vec())))
}
