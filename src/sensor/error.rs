use thiserror::Error;

use super::types::SensorKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SensorError {
    #[error("{0} sensor not present")]
    Unavailable(SensorKind),
    #[error("{0} sensor permission denied")]
    PermissionDenied(SensorKind),
    #[error("{kind} sensor construction failed: {message}")]
    Construction { kind: SensorKind, message: String },
    #[error("{kind} sensor fault: {message}")]
    Fault { kind: SensorKind, message: String },
}
