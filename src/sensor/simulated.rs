//! Scripted sensors for headless sessions.

use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::oneshot;

use super::device::{DeviceSink, SensorBackend, SensorDevice};
use super::error::SensorError;
use super::types::{OrientationSample, RawSample, SensorKind};
use crate::propagation::ObserverCoordinate;

const GEOLOCATION_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    pub frequency_hz: f64,
    pub position: ObserverCoordinate,
    /// Seconds per full turn of the simulated device about the vertical axis.
    pub sweep_period_s: f64,
    pub available: Vec<SensorKind>,
}

impl SimulatedBackend {
    pub fn new(position: ObserverCoordinate, frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            position,
            sweep_period_s: 60.0,
            available: SensorKind::ALL.to_vec(),
        }
    }
}

impl SensorBackend for SimulatedBackend {
    fn acquire(&mut self, kind: SensorKind) -> Result<Box<dyn SensorDevice>, SensorError> {
        if !self.available.contains(&kind) {
            return Err(SensorError::Unavailable(kind));
        }
        if self.frequency_hz <= 0.0 {
            return Err(SensorError::Construction {
                kind,
                message: format!("invalid frequency {}", self.frequency_hz),
            });
        }
        Ok(Box::new(SimulatedDevice {
            kind,
            backend: self.clone(),
            stop_tx: None,
        }))
    }
}

struct SimulatedDevice {
    kind: SensorKind,
    backend: SimulatedBackend,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl SensorDevice for SimulatedDevice {
    fn start(&mut self, sink: DeviceSink) -> Result<(), SensorError> {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let kind = self.kind;
        let backend = self.backend.clone();
        let period = match kind {
            SensorKind::Geolocation => GEOLOCATION_INTERVAL,
            _ => Duration::from_secs_f64(1.0 / backend.frequency_hz),
        };

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let t = started.elapsed().as_secs_f64();
                        if !sink.sample(sample_at(kind, &backend, t)) {
                            break;
                        }
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

fn sample_at(kind: SensorKind, backend: &SimulatedBackend, t: f64) -> RawSample {
    // Device held upright (screen facing the observer) slowly turning in place.
    let yaw = 2.0 * PI * t / backend.sweep_period_s;
    let pitch = PI / 2.0;
    let (sp, cp) = (pitch / 2.0).sin_cos();
    let (sy, cy) = (yaw / 2.0).sin_cos();
    let quaternion = [sp * cy, cp * sy, -sp * sy, cp * cy];

    match kind {
        SensorKind::NineAxis => RawSample::Orientation(OrientationSample::absolute(quaternion)),
        SensorKind::SixAxis => RawSample::Orientation(OrientationSample {
            quaternion,
            heading_offset_rad: 0.0,
        }),
        SensorKind::Geolocation => RawSample::Position(backend.position),
    }
}
