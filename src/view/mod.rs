//! View controllers and the session state they share.

mod ar;
mod frame;
mod globe;

use std::sync::Arc;
use std::time::Duration;

pub use ar::{ArSettings, ArView};
pub use frame::{FrameCancel, FrameLoop};
pub use globe::{GlobeSettings, GlobeView};

use crate::propagation::{ElementSource, ObserverCoordinate, PropagationChannel, TrackerError};
use crate::readiness::{ReadinessBarrier, ReadinessSignal, ReadinessSource};
use crate::sensor::{SensorBackend, SensorManager};

/// What one rendered frame contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects: usize,
    pub labels: usize,
}

/// Long-lived services shared by whichever view is attached. Views borrow
/// the session; they never own the sensors or the tracker.
pub struct Session {
    pub sensors: SensorManager,
    pub tracker: PropagationChannel,
    pub readiness: Arc<ReadinessBarrier>,
}

impl Session {
    pub fn new(sensors: Box<dyn SensorBackend>) -> Self {
        Self {
            sensors: SensorManager::new(sensors),
            tracker: PropagationChannel::new(),
            readiness: Arc::new(ReadinessBarrier::new()),
        }
    }

    /// Start tracking and report the application shell ready.
    pub fn start(
        &mut self,
        source: ElementSource,
        observer: ObserverCoordinate,
        period: Duration,
    ) -> Result<(), TrackerError> {
        self.tracker.start(source, observer, period)?;
        self.readiness.signal_ready(ReadinessSource::Main, true);
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        self.sensors.shutdown();
        self.tracker.stop().await;
    }
}
