//! Message bus abstraction.
//!
//! The router only ever talks to the outside world through a [`MessageBus`]:
//! request/reply calls to the data service and fire-and-forget publishes for
//! notifications and analytics. Two implementations ship with the crate:
//!
//! - [`HttpBus`]: speaks to a bus gateway over HTTP
//! - [`InMemoryBus`]: in-process responders, used by tests and local runs

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

mod error;
pub mod http;
pub mod inbox;
pub mod memory;
pub mod retry;
pub mod topics;

pub use error::TransportError;
pub use http::HttpBus;
pub use inbox::{Disposition, EventHandler, Inbox};
pub use memory::{InMemoryBus, PublishedMessage, Responder};
pub use retry::RetryPolicy;

/// At-least-once pub/sub plus request/reply.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Publish an event. Returns once the bus has accepted it.
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError>;

    /// Send a request and wait for the reply, bounded by `timeout`.
    async fn request(
        &self,
        topic: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError>;

    /// Register the handler for inbound events on `topic`.
    fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> Result<(), TransportError>;

    /// Inbound dispatch table.
    fn inbox(&self) -> Arc<Inbox>;
}
