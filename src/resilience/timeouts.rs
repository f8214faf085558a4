//! Timeout enforcement for outbound calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Only the wait for response headers is bounded; streamed bodies are not
//! - Timeout errors are distinct from transport errors

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

use crate::config::TimeoutConfig;

/// Connection establishment timeout.
pub fn connect(config: &TimeoutConfig) -> Duration {
    Duration::from_secs(config.connect_secs)
}

/// Time allowed for an upstream to send response headers.
pub fn upstream(config: &TimeoutConfig) -> Duration {
    Duration::from_secs(config.upstream_secs)
}

/// Time allowed for a single heartbeat call.
pub fn heartbeat(config: &TimeoutConfig) -> Duration {
    Duration::from_secs(config.heartbeat_secs)
}

/// Run `future`, giving up after `limit`.
pub async fn within<F: Future>(limit: Duration, future: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(limit, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapses_on_slow_future() {
        let result = within(Duration::from_millis(10), tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(result.is_err());
        assert_eq!(within(Duration::from_secs(1), async { 7 }).await.unwrap(), 7);
    }

    #[test]
    fn durations_follow_config() {
        let config = TimeoutConfig::default();
        assert_eq!(connect(&config), Duration::from_secs(5));
        assert_eq!(upstream(&config), Duration::from_secs(100));
        assert_eq!(heartbeat(&config), Duration::from_secs(5));
    }
}
