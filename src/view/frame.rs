use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Owner-held stop flag for a [`FrameLoop`]. Checked before every frame
/// request, so a cancelled loop never schedules another frame.
#[derive(Debug, Clone, Default)]
pub struct FrameCancel(Arc<AtomicBool>);

impl FrameCancel {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cooperative animation-frame scheduler. Each call to
/// [`FrameLoop::next_frame`] requests exactly one frame. Frames that could
/// not be served on time are dropped rather than bunched up.
#[derive(Debug)]
pub struct FrameLoop {
    interval: Interval,
    cancel: FrameCancel,
    frames: u64,
}

impl FrameLoop {
    pub fn new(frame_interval: Duration) -> Self {
        let mut interval = time::interval(frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval,
            cancel: FrameCancel::default(),
            frames: 0,
        }
    }

    pub fn cancel_handle(&self) -> FrameCancel {
        self.cancel.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Wait for the next frame. `None` once cancelled.
    pub async fn next_frame(&mut self) -> Option<Instant> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let at = self.interval.tick().await;
        if self.cancel.is_cancelled() {
            return None;
        }
        self.frames += 1;
        Some(at)
    }
}
