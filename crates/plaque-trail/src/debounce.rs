//! Generation counters for superseding asynchronous work
//!
//! Every logical operation (a search, a walking-route fetch, a persistence
//! write) takes an [`Epoch`] when it starts and checks it again after each
//! suspension point. A newer request bumps the counter, so a late completion
//! of an older one is detectably stale and gets dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sequence number of one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

/// Source of increasing epochs
#[derive(Debug, Default)]
pub struct EpochCounter {
    current: AtomicU64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier one
    pub fn advance(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> Epoch {
        Epoch(self.current.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}

/// Trailing-edge debounce: of several calls inside the window only the last proceeds
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    epochs: EpochCounter,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            epochs: EpochCounter::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the window
    ///
    /// Returns the caller's epoch if no newer call arrived in the meantime,
    /// `None` if it was superseded.
    pub async fn settle(&self) -> Option<Epoch> {
        let epoch = self.epochs.advance();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.epochs.is_current(epoch).then_some(epoch)
    }

    /// Whether `epoch` is still the latest call
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epochs.is_current(epoch)
    }

    /// Supersede whatever is pending
    pub fn cancel(&self) {
        self.epochs.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epochs_increase() {
        let counter = EpochCounter::new();
        assert_eq!(counter.current(), Epoch(0));
        let first = counter.advance();
        let second = counter.advance();
        assert!(second > first);
        assert!(counter.is_current(second));
        assert!(!counter.is_current(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_in_window_settles() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let (first, second) = tokio::join!(debouncer.settle(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            debouncer.settle().await
        });
        assert!(first.is_none());
        let second = second.expect("latest call settles");
        assert!(debouncer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_both_settle() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(debouncer.settle().await.is_some());
        assert!(debouncer.settle().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_supersedes_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let (settled, ()) = tokio::join!(debouncer.settle(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            debouncer.cancel();
        });
        assert!(settled.is_none());
    }

    #[tokio::test]
    async fn test_zero_delay_settles_immediately() {
        let debouncer = Debouncer::new(Duration::ZERO);
        assert_eq!(debouncer.settle().await, Some(Epoch(1)));
    }
}
