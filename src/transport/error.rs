//! Error types for bus operations.

use thiserror::Error;

/// Errors that can occur while talking to the message bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request exceeded its deadline.
    #[error("request on '{topic}' timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },

    /// Bus or remote service unreachable, or answered with a server error.
    #[error("'{topic}' unavailable: {message}")]
    Unavailable { topic: String, message: String },

    /// Nobody answers requests on this topic.
    #[error("no responder for '{topic}'")]
    NoResponder { topic: String },

    /// Remote side refused the request (bad input, unknown entity, ...).
    #[error("'{topic}' rejected request ({code}): {message}")]
    Rejected {
        topic: String,
        code: String,
        message: String,
    },

    /// Payload did not match the schema expected for the topic.
    #[error("invalid payload on '{topic}': {message}")]
    InvalidPayload { topic: String, message: String },

    /// A handler is already subscribed to the topic.
    #[error("topic '{topic}' already has a subscriber")]
    AlreadySubscribed { topic: String },
}

impl TransportError {
    /// Whether this error means the remote side is down or slow.
    ///
    /// Only these count toward circuit breaking.
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout { .. }
                | TransportError::Unavailable { .. }
                | TransportError::NoResponder { .. }
        )
    }

    pub fn topic(&self) -> &str {
        match self {
            TransportError::Timeout { topic, .. }
            | TransportError::Unavailable { topic, .. }
            | TransportError::NoResponder { topic }
            | TransportError::Rejected { topic, .. }
            | TransportError::InvalidPayload { topic, .. }
            | TransportError::AlreadySubscribed { topic } => topic,
        }
    }

    pub(crate) fn invalid(topic: &str, err: impl std::fmt::Display) -> Self {
        TransportError::InvalidPayload {
            topic: topic.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailability_classification() {
        let timeout = TransportError::Timeout {
            topic: "lead.get".to_string(),
            timeout_ms: 5000,
        };
        let rejected = TransportError::Rejected {
            topic: "lead.get".to_string(),
            code: "not_found".to_string(),
            message: "no such lead".to_string(),
        };
        let invalid = TransportError::invalid("lead.get", "missing field `id`");

        assert!(timeout.is_unavailability());
        assert!(TransportError::NoResponder {
            topic: "x".to_string()
        }
        .is_unavailability());
        assert!(!rejected.is_unavailability());
        assert!(!invalid.is_unavailability());
    }

    #[test]
    fn display_includes_topic() {
        let err = TransportError::Timeout {
            topic: "agents.match".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "request on 'agents.match' timed out after 250ms");
        assert_eq!(err.topic(), "agents.match");
    }
}
