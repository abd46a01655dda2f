//! `lead.needs_routing` event consumer

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{Orchestrator, RoutingError};
use crate::transport::topics::{decode, NeedsRouting};
use crate::transport::{Disposition, EventHandler};

/// Feeds routing events into the orchestrator and reports a terminal
/// disposition for each
pub struct RoutingConsumer {
    orchestrator: Arc<Orchestrator>,
}

impl RoutingConsumer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Map a routing failure to what the bus should do with the event
pub fn disposition_for(err: &RoutingError) -> Disposition {
    match err {
        RoutingError::AssignmentConflict { .. } => Disposition::Ack,
        e if e.is_transient() => Disposition::Requeue,
        _ => Disposition::Reject,
    }
}

#[async_trait]
impl EventHandler for RoutingConsumer {
    async fn handle(&self, topic: &str, payload: Value) -> Disposition {
        let event: NeedsRouting = match decode(topic, payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Dropping malformed routing event");
                return Disposition::Reject;
            }
        };

        match self
            .orchestrator
            .route_lead_excluding(&event.lead_id, &event.exclude_agent_ids)
            .await
        {
            Ok(_) => Disposition::Ack,
            Err(err) => {
                let disposition = disposition_for(&err);
                tracing::debug!(
                    lead_id = %event.lead_id,
                    code = err.code(),
                    disposition = disposition.as_str(),
                    "Routing attempt finished with error"
                );
                disposition
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_requeue() {
        let err = RoutingError::BreakerOpen {
            lead_id: "L1".into(),
            service: "dataService".into(),
        };
        assert_eq!(disposition_for(&err), Disposition::Requeue);

        let err = RoutingError::DownstreamUnavailable {
            lead_id: "L1".into(),
            service: "dataService".into(),
            message: "timeout".into(),
        };
        assert_eq!(disposition_for(&err), Disposition::Requeue);
    }

    #[test]
    fn permanent_errors_reject() {
        assert_eq!(
            disposition_for(&RoutingError::validation("L1", "missing")),
            Disposition::Reject
        );
        assert_eq!(
            disposition_for(&RoutingError::NoEligibleCandidates {
                lead_id: "L1".into()
            }),
            Disposition::Reject
        );
    }

    #[test]
    fn conflict_is_acknowledged() {
        let err = RoutingError::AssignmentConflict {
            lead_id: "L1".into(),
            agent_id: "A".into(),
        };
        assert_eq!(disposition_for(&err), Disposition::Ack);
    }
}
