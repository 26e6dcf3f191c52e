mod capability;
mod device;
mod error;
mod manager;
mod simulated;
mod types;

pub use capability::{classify, CapabilityLevel, Liveness};
pub use device::{DeviceEvent, DeviceMessage, DeviceSink, NullBackend, SensorBackend, SensorDevice};
pub use error::SensorError;
pub use manager::SensorManager;
pub use simulated::SimulatedBackend;
pub use types::{
    OrientationSample, OrientationSource, RawSample, SensorEvent, SensorKind, SensorState,
    SensorUpdate,
};

#[cfg(test)]
pub(crate) use manager::tests::{ManualBackend, LEVEL};
