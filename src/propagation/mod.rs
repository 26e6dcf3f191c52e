mod channel;
mod engine;
mod error;
mod geodesy;
mod source;
mod types;
mod watchdog;
mod worker;

pub use channel::PropagationChannel;
pub use engine::{EngineState, PropagationEngine};
pub use error::TrackerError;
pub use source::{parse_element_sets, ElementSource};
pub use types::{
    ElementSet, Geodetic, Horizontal, ObserverCoordinate, TargetRef, TargetStateVector,
    TickPayload, TopocentricVelocity, TrackerEvent, TrackerMode, TrackerStatus, WorkerCommand,
};
pub use watchdog::{StallWatchdog, DEFAULT_STALL_FACTOR};
pub use worker::DEFAULT_PERIOD;

#[cfg(test)]
pub(crate) use engine::tests::{catalog, iss};
