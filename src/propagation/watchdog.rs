use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_STALL_FACTOR: u32 = 3;

/// Consumer-side stall detection: no tick within `factor × period` means the
/// tracker is treated as stalled until the next tick arrives.
#[derive(Debug, Clone)]
pub struct StallWatchdog {
    period: Duration,
    factor: u32,
    armed_at: Instant,
    last_tick: Option<Instant>,
}

impl StallWatchdog {
    pub fn new(period: Duration, factor: u32, now: Instant) -> Self {
        Self {
            period,
            factor: factor.max(1),
            armed_at: now,
            last_tick: None,
        }
    }

    pub fn set_period(&mut self, period: Duration, now: Instant) {
        self.period = period;
        self.armed_at = now;
    }

    pub fn record_tick(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    pub fn timeout(&self) -> Duration {
        self.period * self.factor
    }

    pub fn is_stalled(&self, now: Instant) -> bool {
        let since = self.last_tick.map_or(self.armed_at, |t| t.max(self.armed_at));
        now.saturating_duration_since(since) > self.timeout()
    }
}
