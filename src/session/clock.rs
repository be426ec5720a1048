//! Injectable time source for pacing and polling

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time, via the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Yields instead of waiting, and remembers how long it was asked to wait
#[derive(Debug, Default)]
pub struct ImmediateClock {
    slept_ms: AtomicU64,
    sleeps: AtomicU64,
}

impl ImmediateClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time callers asked to sleep
    pub fn total_slept(&self) -> Duration {
        Duration::from_millis(self.slept_ms.load(Ordering::Relaxed))
    }

    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Clock for ImmediateClock {
    async fn sleep(&self, duration: Duration) {
        self.slept_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.sleeps.fetch_add(1, Ordering::Relaxed);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_immediate_clock_accumulates() {
        let clock = ImmediateClock::new();
        clock.sleep(Duration::from_millis(50)).await;
        clock.sleep(Duration::from_millis(1000)).await;

        assert_eq!(clock.total_slept(), Duration::from_millis(1050));
        assert_eq!(clock.sleep_count(), 2);
    }
}
