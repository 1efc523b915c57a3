use std::time::Duration;

/// Doubling reconnect delay, reset once a subscription is re-established.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    next: Duration,
    consecutive_failures: u32,
}

impl ReconnectBackoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self { initial, max, next: initial, consecutive_failures: 0 }
    }

    /// Returns the delay before the next attempt and doubles the one after it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        delay
    }

    pub fn record_success(&mut self) {
        self.next = self.initial;
        self.consecutive_failures = 0;
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
