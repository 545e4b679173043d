/// API endpoint modules
pub mod account;
pub mod admin;
pub mod box_ids;
pub mod boxes;
pub mod labels;
pub mod uploads;
pub mod users;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}
