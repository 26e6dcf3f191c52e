use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker already running")]
    AlreadyRunning,
    #[error("element set fetch failed: {0}")]
    Fetch(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("element set read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid element set json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no usable element sets")]
    NoElements,
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("tick arrays misaligned: {geodetic}/{horizontal}/{velocity}/{names}")]
    Misaligned {
        geodetic: usize,
        horizontal: usize,
        velocity: usize,
        names: usize,
    },
    #[error("tracker unavailable: {0}")]
    Unavailable(String),
    #[error("propagation worker is gone")]
    WorkerGone,
}

impl From<sgp4::Error> for TrackerError {
    fn from(err: sgp4::Error) -> Self {
        TrackerError::Propagation(err.to_string())
    }
}
