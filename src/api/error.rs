//! Error responses for the HTTP surface

use crate::transport::topics::ErrorReply;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// An error rendered as `{ "error": { "code", "message" } }`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn no_subscriber(topic: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "no_subscriber",
            format!("No subscriber for topic '{}'", topic),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorReply::new(self.code, self.message);
        (self.status, Json(body)).into_response()
    }
}
