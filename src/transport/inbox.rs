//! Inbound event dispatch.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use super::TransportError;

/// What the bus should do with a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled, do not redeliver
    Ack,
    /// Transient failure, redeliver later
    Requeue,
    /// Permanent failure, drop (dead-letter)
    Reject,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Ack => "ack",
            Disposition::Requeue => "requeue",
            Disposition::Reject => "reject",
        }
    }
}

/// Consumer of inbound events on one topic.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, topic: &str, payload: Value) -> Disposition;
}

/// Topic -> handler table. One handler per topic.
#[derive(Default)]
pub struct Inbox {
    handlers: DashMap<String, Arc<dyn EventHandler>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        topic: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), TransportError> {
        match self.handlers.entry(topic.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(TransportError::AlreadySubscribed {
                topic: topic.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    pub fn has_subscriber(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        topics.sort();
        topics
    }

    /// Deliver one event. `None` when nobody subscribes to the topic.
    pub async fn dispatch(&self, topic: &str, payload: Value) -> Option<Disposition> {
        // Clone out so no shard lock is held across the handler's awaits
        let handler = self.handlers.get(topic).map(|h| Arc::clone(h.value()))?;
        Some(handler.handle(topic, payload).await)
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox")
            .field("topics", &self.topics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        reply: Disposition,
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _topic: &str, _payload: Value) -> Disposition {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let inbox = Inbox::new();
        let handler = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            reply: Disposition::Requeue,
        });
        inbox.register("lead.needs_routing", handler.clone()).unwrap();

        let result = inbox.dispatch("lead.needs_routing", json!({})).await;
        assert_eq!(result, Some(Disposition::Requeue));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_topic_returns_none() {
        let inbox = Inbox::new();
        assert_eq!(inbox.dispatch("nope", json!({})).await, None);
    }

    #[test]
    fn second_registration_is_refused() {
        let inbox = Inbox::new();
        let make = || {
            Arc::new(Counting {
                calls: AtomicUsize::new(0),
                reply: Disposition::Ack,
            })
        };
        inbox.register("t", make()).unwrap();
        let err = inbox.register("t", make()).unwrap_err();
        assert_eq!(
            err,
            TransportError::AlreadySubscribed {
                topic: "t".to_string()
            }
        );
        assert_eq!(inbox.topics(), vec!["t".to_string()]);
    }
}
