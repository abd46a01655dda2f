//! Inbound bus events.
//!
//! The bus gateway POSTs each event for a subscribed topic here. The
//! handler's disposition is returned as the HTTP status so the gateway
//! knows whether to redeliver: 200 ack, 503 requeue, 422 reject.

use super::{ApiError, AppState};
use crate::transport::Disposition;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Body returned for every dispatched event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAck {
    pub topic: String,
    pub disposition: String,
}

fn status_for(disposition: Disposition) -> StatusCode {
    match disposition {
        Disposition::Ack => StatusCode::OK,
        Disposition::Requeue => StatusCode::SERVICE_UNAVAILABLE,
        Disposition::Reject => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// POST /v1/events/:topic
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) =
        payload.map_err(|e| ApiError::new(e.status(), "invalid_payload", e.body_text()))?;

    let disposition = state
        .inbox
        .dispatch(&topic, payload)
        .await
        .ok_or_else(|| ApiError::no_subscriber(&topic))?;

    tracing::debug!(topic = %topic, disposition = disposition.as_str(), "Event dispatched");

    let body = EventAck {
        topic,
        disposition: disposition.as_str().to_string(),
    };
    Ok((status_for(disposition), Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_status_mapping() {
        assert_eq!(status_for(Disposition::Ack), StatusCode::OK);
        assert_eq!(
            status_for(Disposition::Requeue),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(Disposition::Reject),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
