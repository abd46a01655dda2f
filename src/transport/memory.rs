//! In-process message bus.
//!
//! Requests are answered by registered responder closures, publishes are
//! recorded and delivered to local subscribers with at-least-once semantics:
//! a handler answering [`Disposition::Requeue`] gets the event again, up to
//! `max_deliveries` times.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::{Disposition, EventHandler, Inbox, MessageBus, TransportError};

/// Synchronous request handler for one topic.
pub type Responder = Arc<dyn Fn(Value) -> Result<Value, TransportError> + Send + Sync>;

/// A publish observed by the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

pub struct InMemoryBus {
    inbox: Arc<Inbox>,
    responders: DashMap<String, Responder>,
    latencies: DashMap<String, Duration>,
    publish_failures: DashMap<String, TransportError>,
    request_counts: DashMap<String, usize>,
    published: RwLock<Vec<PublishedMessage>>,
    max_deliveries: u32,
    redelivery_delay: Duration,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            inbox: Arc::new(Inbox::new()),
            responders: DashMap::new(),
            latencies: DashMap::new(),
            publish_failures: DashMap::new(),
            request_counts: DashMap::new(),
            published: RwLock::new(Vec::new()),
            max_deliveries: 5,
            redelivery_delay: Duration::from_millis(10),
        }
    }

    pub fn with_max_deliveries(mut self, max_deliveries: u32) -> Self {
        self.max_deliveries = max_deliveries.max(1);
        self
    }

    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    /// Answer requests on `topic` with `f`, replacing any previous responder.
    pub fn respond<F>(&self, topic: &str, f: F)
    where
        F: Fn(Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.responders.insert(topic.to_string(), Arc::new(f));
    }

    pub fn remove_responder(&self, topic: &str) {
        self.responders.remove(topic);
    }

    /// Delay replies on `topic`. A delay at or above the caller's timeout
    /// produces [`TransportError::Timeout`].
    pub fn set_latency(&self, topic: &str, latency: Option<Duration>) {
        match latency {
            Some(latency) => {
                self.latencies.insert(topic.to_string(), latency);
            }
            None => {
                self.latencies.remove(topic);
            }
        }
    }

    /// Make every publish on `topic` fail with `error`.
    pub fn fail_publishes(&self, topic: &str, error: Option<TransportError>) {
        match error {
            Some(error) => {
                self.publish_failures.insert(topic.to_string(), error);
            }
            None => {
                self.publish_failures.remove(topic);
            }
        }
    }

    /// Number of requests that reached a responder (or found none) on `topic`.
    pub fn request_count(&self, topic: &str) -> usize {
        self.request_counts.get(topic).map(|c| *c).unwrap_or(0)
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn published_on(&self, topic: &str) -> Vec<Value> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn clear_published(&self) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Deliver an event to the local subscriber and wait for the final
    /// disposition, redelivering on `Requeue`.
    pub async fn deliver(&self, topic: &str, payload: Value) -> Option<Disposition> {
        deliver_with_redelivery(
            &self.inbox,
            topic,
            payload,
            self.max_deliveries,
            self.redelivery_delay,
        )
        .await
    }
}

async fn deliver_with_redelivery(
    inbox: &Inbox,
    topic: &str,
    payload: Value,
    max_deliveries: u32,
    delay: Duration,
) -> Option<Disposition> {
    let mut attempt = 1;
    loop {
        let disposition = inbox.dispatch(topic, payload.clone()).await?;
        if disposition != Disposition::Requeue || attempt >= max_deliveries {
            if disposition == Disposition::Requeue {
                tracing::warn!(topic, attempts = attempt, "Redelivery budget exhausted");
            }
            return Some(disposition);
        }
        tracing::debug!(topic, attempt, "Requeued event, redelivering");
        attempt += 1;
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError> {
        if let Some(err) = self.publish_failures.get(topic) {
            return Err(err.value().clone());
        }

        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.clone(),
                published_at: Utc::now(),
            });

        if self.inbox.has_subscriber(topic) {
            let inbox = Arc::clone(&self.inbox);
            let topic = topic.to_string();
            let max_deliveries = self.max_deliveries;
            let delay = self.redelivery_delay;
            tokio::spawn(async move {
                deliver_with_redelivery(&inbox, &topic, payload, max_deliveries, delay).await;
            });
        }
        Ok(())
    }

    async fn request(
        &self,
        topic: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        *self.request_counts.entry(topic.to_string()).or_insert(0) += 1;

        let responder = self
            .responders
            .get(topic)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| TransportError::NoResponder {
                topic: topic.to_string(),
            })?;
        let latency = self.latencies.get(topic).map(|l| *l.value());

        let reply = async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            responder(payload)
        };

        tokio::time::timeout(timeout, reply)
            .await
            .map_err(|_| TransportError::Timeout {
                topic: topic.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> Result<(), TransportError> {
        self.inbox.register(topic, handler)
    }

    fn inbox(&self) -> Arc<Inbox> {
        Arc::clone(&self.inbox)
    }
}
