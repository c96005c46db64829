//! Bounded waits on external collaborators.

use crate::error::ConversationError;
use std::future::Future;
use std::time::Duration;

/// Await `fut`, giving up after `limit`. `None` waits indefinitely.
pub async fn within<F: Future>(
    limit: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> Result<F::Output, ConversationError> {
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ConversationError::Timeout { operation, after }),
        None => Ok(fut.await),
    }
}
