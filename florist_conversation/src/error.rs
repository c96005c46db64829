use std::time::Duration;
use thiserror::Error;

/// Errors that abort processing of a single message.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("failed to deliver reply: {0}")]
    Delivery(#[source] anyhow::Error),
}
