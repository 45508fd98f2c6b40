//! Tokio-based clock implementation.

use async_trait::async_trait;
use std::time::Duration;

use crate::traits::Clock;
use crate::transfer::Timestamp;

/// Production clock: system wall time and Tokio's async sleep.
///
/// # Examples
///
/// ```rust
/// use cctp_orchestrator::providers::TokioClock;
/// use cctp_orchestrator::traits::Clock;
///
/// let clock = TokioClock::new();
/// assert!(clock.now().as_unix_millis() > 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
