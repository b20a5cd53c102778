//! Bounded-concurrency gate for oracle calls.
//!
//! At most `width` calls are in flight at once, and each call keeps its slot
//! for `cooldown` after completing. Futures are polled together on the
//! current task; nothing is spawned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::config::AdjudicationConfig;

#[derive(Debug, Clone)]
pub struct ThrottledInvoker {
    gate: Arc<Semaphore>,
    width: usize,
    cooldown: Duration,
}

impl ThrottledInvoker {
    pub fn new(width: usize, cooldown: Duration) -> Self {
        let width = width.max(1);
        Self {
            gate: Arc::new(Semaphore::new(width)),
            width,
            cooldown,
        }
    }

    pub fn from_config(config: &AdjudicationConfig) -> Self {
        Self::new(config.max_concurrent_calls, config.inter_call_cooldown())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Run one call under the gate.
    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        // The semaphore is never closed, so a permit is always granted.
        let permit = self.gate.acquire().await.ok();
        let output = call.await;
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
        drop(permit);
        output
    }

    /// Run every call under the gate and return the outputs in call order.
    pub async fn gather<F, I>(&self, calls: I) -> Vec<F::Output>
    where
        F: Future,
        I: IntoIterator<Item = F>,
    {
        join_all(calls.into_iter().map(|call| self.run(call))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_gather_never_exceeds_width() {
        let invoker = ThrottledInvoker::new(2, Duration::from_millis(1000));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..7).map(|i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        });

        let out = invoker.gather(calls).await;
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_holds_slot_after_call() {
        let invoker = ThrottledInvoker::new(2, Duration::from_secs(1));
        let start = tokio::time::Instant::now();
        invoker.gather((0..4).map(|_| async {})).await;
        // Two waves of two calls, each wave holding its slots for one second.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_width_is_clamped() {
        let invoker = ThrottledInvoker::new(0, Duration::ZERO);
        assert_eq!(invoker.width(), 1);
        assert_eq!(invoker.run(async { 5 }).await, 5);
    }
}
