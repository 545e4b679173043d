/// Label endpoints
#[path = "common/mod.rs"]
mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use common::{TestApp, token, user_token};
use nesttag_core::{models::Label, services::LabelStore};
use serde_json::json;

async fn seed_label(app: &TestApp, user_id: &str, name: &str, offset_secs: i64) -> Label {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
    let label = Label::new(user_id, name, Some("#ff0000"), None, now);
    app.labels.put(&label).await.unwrap();
    label
}

#[tokio::test]
async fn test_list_labels_requires_authentication() {
    let app = TestApp::new();

    let response = app.get("/labels").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Authentication required");

    let expired = token("user-1", "user-1", &[], -60);
    let response = app.call(Method::GET, "/labels", Some(&expired), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_labels_for_token_subject() {
    let app = TestApp::new();
    seed_label(&app, "user-1", "Kitchen", 0).await;
    seed_label(&app, "user-1", "Garage", 1).await;
    seed_label(&app, "user-2", "Attic", 2).await;

    let response = app
        .call(Method::GET, "/labels", Some(&user_token("user-1")), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
    let names: Vec<&str> = response.body["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Kitchen"));
    assert!(names.contains(&"Garage"));
}

#[tokio::test]
async fn test_list_labels_with_opaque_access_token() {
    let app = TestApp::new();
    app.identity.add_user("user-9", "nine@example.com", "password123");
    app.identity.issue_access_token("opaque-access-token", "user-9");
    seed_label(&app, "user-9", "Books", 0).await;

    let response = app
        .call(Method::GET, "/labels", Some("opaque-access-token"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);

    let response = app
        .call(Method::GET, "/labels", Some("unknown-token"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_label() {
    let app = TestApp::new();

    let response = app
        .post("/labels", json!({"name": "Winter", "userId": "user-1"}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let label = &response.body["label"];
    assert_eq!(label["name"], "Winter");
    assert_eq!(label["color"], "#0366d6");
    assert!(label["id"].as_str().unwrap().starts_with("custom-"));
    assert_eq!(app.labels.list_for_user("user-1").await.unwrap().len(), 1);

    let response = app.post("/labels", json!({"name": "Winter"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Name and userId are required");
}

#[tokio::test]
async fn test_update_label() {
    let app = TestApp::new();
    let label = seed_label(&app, "user-1", "Kitchen", 0).await;
    let uri = format!("/labels/{}", label.id);

    let response = app
        .call(
            Method::PUT,
            &uri,
            None,
            Some(json!({"name": "Pantry", "color": "#00ff00", "description": "Dry food"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["label"]["name"], "Pantry");
    assert_eq!(response.body["label"]["color"], "#00ff00");
    assert_eq!(response.body["label"]["description"], "Dry food");
    assert_eq!(response.body["label"]["userId"], "user-1");

    let response = app
        .call(Method::PUT, &uri, None, Some(json!({"color": "#00ff00"})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "name is required");

    let response = app
        .call(Method::PUT, "/labels/custom-0", None, Some(json!({"name": "x"})))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Label not found");
}

#[tokio::test]
async fn test_delete_label() {
    let app = TestApp::new();
    let label = seed_label(&app, "user-1", "Kitchen", 0).await;

    let response = app
        .call(Method::DELETE, &format!("/labels/{}", label.id), None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Label deleted successfully");
    assert!(app.labels.list_for_user("user-1").await.unwrap().is_empty());
}
