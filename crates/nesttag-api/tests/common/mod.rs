//! Common test utilities for the API integration tests
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use nesttag_api::{ApiContext, Services, router};
use nesttag_core::{
    AppConfig,
    constants::DEFAULT_ADMIN_GROUP,
    services::{
        CdnSigner, InMemoryBoxIdRegistry, InMemoryBoxStore, InMemoryIdentityProvider,
        InMemoryLabelStore, InMemoryObjectStorage,
    },
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const BUCKET: &str = "nesttag-files-test";

pub fn test_config() -> AppConfig {
    AppConfig {
        boxes_table: "boxes-test".to_string(),
        labels_table: "labels-test".to_string(),
        box_ids_table: "box-ids-test".to_string(),
        bucket: BUCKET.to_string(),
        user_pool_id: "us-east-1_test".to_string(),
        client_id: "test-client".to_string(),
        admin_group: DEFAULT_ADMIN_GROUP.to_string(),
        endpoint_url: None,
        jwks_json: None,
        cdn: None,
        require_registered_box_id: false,
    }
}

/// Router wired to in-memory services, with handles to inspect their state
pub struct TestApp {
    pub ctx: Arc<ApiContext>,
    pub boxes: Arc<InMemoryBoxStore>,
    pub labels: Arc<InMemoryLabelStore>,
    pub box_ids: Arc<InMemoryBoxIdRegistry>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub identity: Arc<InMemoryIdentityProvider>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_cdn(cdn: Arc<dyn CdnSigner>) -> Self {
        Self::build(test_config(), Some(cdn))
    }

    fn build(config: AppConfig, cdn: Option<Arc<dyn CdnSigner>>) -> Self {
        let boxes = Arc::new(InMemoryBoxStore::new());
        let labels = Arc::new(InMemoryLabelStore::new());
        let box_ids = Arc::new(InMemoryBoxIdRegistry::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let identity = Arc::new(InMemoryIdentityProvider::new());

        let services = Services {
            boxes: boxes.clone(),
            labels: labels.clone(),
            box_ids: box_ids.clone(),
            storage: storage.clone(),
            identity: identity.clone(),
            cdn,
        };

        let ctx = ApiContext::with_services(config, services).expect("context");

        Self {
            ctx,
            boxes,
            labels,
            box_ids,
            storage,
            identity,
        }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.ctx))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.expect("router response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(build_request(method, uri, token, body, &[])).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.call(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.call(Method::POST, uri, None, Some(body)).await
    }
}

pub fn build_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    builder.body(body).expect("request")
}

/// Mints an ID-token-shaped JWT; signatures are not checked without a JWKS
pub fn token(sub: &str, username: &str, groups: &[&str], expires_in_secs: i64) -> String {
    let claims = json!({
        "sub": sub,
        "cognito:username": username,
        "email": format!("{}@example.com", username),
        "cognito:groups": groups,
        "exp": Utc::now().timestamp() + expires_in_secs,
    });

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("token")
}

pub fn user_token(sub: &str) -> String {
    token(sub, sub, &[], 3600)
}

pub fn admin_token(username: &str) -> String {
    token(&format!("sub-{}", username), username, &[DEFAULT_ADMIN_GROUP], 3600)
}
