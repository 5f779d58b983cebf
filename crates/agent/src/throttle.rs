//! Post-iteration rate limiting.

use async_trait::async_trait;
use std::time::Duration;

/// Pause applied after every recorded iteration.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleep for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_secs(1))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// No pause at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_sleeps() {
        let start = Instant::now();
        FixedDelay::default().pause().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_returns_immediately() {
        let start = Instant::now();
        NoDelay.pause().await;
        FixedDelay(Duration::ZERO).pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
