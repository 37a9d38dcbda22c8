//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::StrandError;

/// Await `future`, failing the stream if it stays silent for `idle`.
///
/// `None` waits indefinitely.
pub async fn with_idle_timeout<T>(
    idle: Option<Duration>,
    future: impl Future<Output = T>,
) -> Result<T, StrandError> {
    let Some(duration) = idle else {
        return Ok(future.await);
    };
    tokio::time::timeout(duration, future).await.map_err(|_| {
        StrandError::StreamingFailed(format!(
            "no stream event received for {}ms",
            duration.as_millis()
        ))
    })
}
