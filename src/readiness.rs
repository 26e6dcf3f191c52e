//! "All clear" barrier between the application shell and the active view.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use strum_macros::Display;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReadinessSource {
    /// Application shell: tracker started, splash assets loaded.
    Main,
    /// Active view: scene resources allocated.
    Page,
}

pub trait ReadinessSignal: Send + Sync {
    fn signal_ready(&self, from: ReadinessSource, state: bool);
}

/// Goes clear once every source has reported ready. Any source reporting
/// not-ready closes it again.
#[derive(Debug)]
pub struct ReadinessBarrier {
    state: Mutex<[bool; 2]>,
    clear: watch::Sender<bool>,
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        let (clear, _) = watch::channel(false);
        Self {
            state: Mutex::new([false; 2]),
            clear,
        }
    }

    pub fn is_clear(&self) -> bool {
        *self.clear.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.clear.subscribe()
    }
}

impl ReadinessSignal for ReadinessBarrier {
    fn signal_ready(&self, from: ReadinessSource, state: bool) {
        let all = {
            let mut s = self.state.lock().unwrap();
            s[from as usize] = state;
            s.iter().all(|ready| *ready)
        };
        log::debug!("Readiness {} = {}, all clear: {}", from, state, all);
        self.clear.send_replace(all);
    }
}
