use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{ClientError, ClientResult};

/// Await a collaborator call, giving up after `limit`.
///
/// Dropping the returned future cancels the inner call as well.
pub async fn with_timeout<T, F>(service: &'static str, limit: Duration, call: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(service, after_ms, "Collaborator call timed out");
            Err(ClientError::Timeout { service, after_ms })
        }
    }
}
