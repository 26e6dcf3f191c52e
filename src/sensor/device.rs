//! Seams to sensor hardware.

use tokio::sync::mpsc;

use super::error::SensorError;
use super::types::{RawSample, SensorKind};

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Sample(RawSample),
    Fault(String),
}

/// Device event tagged with the activation it belongs to. Events from a
/// superseded activation are ignored by the manager.
#[derive(Debug, Clone)]
pub struct DeviceMessage {
    pub kind: SensorKind,
    pub generation: u64,
    pub event: DeviceEvent,
}

/// Handed to a device on start; the device pushes its samples and faults
/// through it from whatever thread or task it runs on.
#[derive(Debug, Clone)]
pub struct DeviceSink {
    kind: SensorKind,
    generation: u64,
    tx: mpsc::UnboundedSender<DeviceMessage>,
}

impl DeviceSink {
    pub(super) fn new(
        kind: SensorKind,
        generation: u64,
        tx: mpsc::UnboundedSender<DeviceMessage>,
    ) -> Self {
        Self {
            kind,
            generation,
            tx,
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Returns `false` once the manager is gone.
    pub fn sample(&self, sample: RawSample) -> bool {
        self.send(DeviceEvent::Sample(sample))
    }

    pub fn fault(&self, message: impl Into<String>) -> bool {
        self.send(DeviceEvent::Fault(message.into()))
    }

    fn send(&self, event: DeviceEvent) -> bool {
        self.tx
            .send(DeviceMessage {
                kind: self.kind,
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

pub trait SensorDevice: Send {
    fn start(&mut self, sink: DeviceSink) -> Result<(), SensorError>;
    fn stop(&mut self);
}

/// Acquires physical devices. At most one device per kind is held at a time,
/// and only by the sensor manager.
pub trait SensorBackend: Send {
    fn acquire(&mut self, kind: SensorKind) -> Result<Box<dyn SensorDevice>, SensorError>;
}

/// Backend for hosts without any sensors.
#[derive(Debug, Default)]
pub struct NullBackend;

impl SensorBackend for NullBackend {
    fn acquire(&mut self, kind: SensorKind) -> Result<Box<dyn SensorDevice>, SensorError> {
        Err(SensorError::Unavailable(kind))
    }
}
