use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::capability::CapabilityLevel;
use crate::propagation::ObserverCoordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorKind {
    /// Absolute orientation (accelerometer, gyroscope, magnetometer).
    NineAxis,
    /// Relative orientation (accelerometer, gyroscope). No true heading.
    SixAxis,
    Geolocation,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::NineAxis,
        SensorKind::SixAxis,
        SensorKind::Geolocation,
    ];

    pub(super) fn index(self) -> usize {
        match self {
            SensorKind::NineAxis => 0,
            SensorKind::SixAxis => 1,
            SensorKind::Geolocation => 2,
        }
    }
}

/// The two orientation inputs fusion can choose between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OrientationSource {
    NineAxis,
    SixAxis,
}

impl From<OrientationSource> for SensorKind {
    fn from(source: OrientationSource) -> Self {
        match source {
            OrientationSource::NineAxis => SensorKind::NineAxis,
            OrientationSource::SixAxis => SensorKind::SixAxis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SensorState {
    Undiscovered,
    Unavailable,
    Active,
    Errored,
}

/// Per-sensor channel payload: a liveness change or a data sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent<T> {
    Liveness(bool),
    Reading(T),
}

impl<T> SensorEvent<T> {
    pub fn reading(self) -> Option<T> {
        match self {
            SensorEvent::Reading(value) => Some(value),
            SensorEvent::Liveness(_) => None,
        }
    }
}

/// Raw attitude sample as `[x, y, z, w]`, plus the calibration heading offset
/// that relative sources carry.
/// Everything the manager publishes, in the order it happened. A liveness
/// change always precedes the capability label it caused.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorUpdate {
    Capability(CapabilityLevel),
    Orientation(OrientationSource, SensorEvent<OrientationSample>),
    Geolocation(SensorEvent<ObserverCoordinate>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub quaternion: [f64; 4],
    pub heading_offset_rad: f64,
}

impl OrientationSample {
    pub fn absolute(quaternion: [f64; 4]) -> Self {
        Self {
            quaternion,
            heading_offset_rad: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    Orientation(OrientationSample),
    Position(ObserverCoordinate),
}
