//! HTTP adapter for a bus gateway.
//!
//! - requests: `POST {bus_url}/rpc/{topic}` with the payload as JSON body,
//!   the reply body is the response payload
//! - publishes: `POST {bus_url}/events/{topic}`
//! - inbound events are pushed by the gateway to `POST /v1/events/{topic}`
//!   on our own HTTP server and dispatched through the shared [`Inbox`]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::topics::decode;
use super::{EventHandler, Inbox, MessageBus, RetryPolicy, TransportError};
use crate::config::TransportConfig;

pub struct HttpBus {
    client: reqwest::Client,
    base_url: String,
    publish_timeout: Duration,
    retry: RetryPolicy,
    inbox: Arc<Inbox>,
}

impl HttpBus {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| TransportError::Unavailable {
                topic: "*".to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.bus_url.trim_end_matches('/').to_string(),
            publish_timeout: config.notification_timeout(),
            retry: config.retry.clone(),
            inbox: Arc::new(Inbox::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One HTTP attempt bounded by `attempt_timeout`. Timeouts are reported
    /// against the caller's full `timeout`.
    async fn post_once(
        &self,
        url: &str,
        topic: &str,
        payload: &Value,
        attempt_timeout: Duration,
        timeout: Duration,
    ) -> Result<Option<Value>, TransportError> {
        let response = self
            .client
            .post(url)
            .timeout(attempt_timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| map_reqwest_error(topic, timeout, e))?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Unavailable {
                topic: topic.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the structured error body when the gateway sent one
            if let Ok(value) = serde_json::from_str::<Value>(&body) {
                if let Err(err @ TransportError::Rejected { .. }) = decode::<Value>(topic, value) {
                    return Err(err);
                }
            }
            return Err(TransportError::Rejected {
                topic: topic.to_string(),
                code: format!("http_{}", status.as_u16()),
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(topic, timeout, e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| TransportError::invalid(topic, e))
    }

    async fn post_with_retry(
        &self,
        url: String,
        topic: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Option<Value>, TransportError> {
        // The caller's timeout covers every attempt and backoff together
        let deadline = Instant::now() + timeout;
        let mut attempt = 1;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self
                .post_once(&url, topic, payload, remaining, timeout)
                .await
            {
                Ok(reply) => return Ok(reply),
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let delay = self.retry.backoff(attempt);
                    if Instant::now() + delay >= deadline {
                        tracing::debug!(
                            topic,
                            attempt,
                            error = %err,
                            "No time left to retry bus call"
                        );
                        return Err(err);
                    }
                    tracing::debug!(
                        topic,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Bus call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn map_reqwest_error(topic: &str, timeout: Duration, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            topic: topic.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        TransportError::Unavailable {
            topic: topic.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl MessageBus for HttpBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError> {
        let url = format!("{}/events/{}", self.base_url, topic);
        self.post_with_retry(url, topic, &payload, self.publish_timeout)
            .await
            .map(|_| ())
    }

    async fn request(
        &self,
        topic: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let url = format!("{}/rpc/{}", self.base_url, topic);
        let reply = self.post_with_retry(url, topic, &payload, timeout).await?;
        reply.ok_or_else(|| TransportError::invalid(topic, "empty reply body"))
    }

    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> Result<(), TransportError> {
        self.inbox.register(topic, handler)
    }

    fn inbox(&self) -> Arc<Inbox> {
        Arc::clone(&self.inbox)
    }
}

impl std::fmt::Debug for HttpBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBus")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}
