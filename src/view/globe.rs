use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::time::Duration;
use tokio::time::Instant;

use super::frame::FrameLoop;
use super::{FrameStats, Session};
use crate::propagation::{StallWatchdog, TrackerEvent, DEFAULT_PERIOD, DEFAULT_STALL_FACTOR};
use crate::pubsub::Subscription;
use crate::readiness::{ReadinessSignal, ReadinessSource};
use crate::scene::{Geometry, InstanceLayer, MeshHandle, RenderBackend, SceneError};
use crate::transform::{self, PerspectiveCamera, EARTH_RADIUS_KM};

/// Kilometres to scene units.
const GLOBE_SCALE: f64 = 0.001;
const SKY_RADIUS: f64 = 100.0;
const EARTH_RATE_RAD_S: f64 = TAU / (24.0 * 3600.0);
const MIN_POLAR: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct GlobeSettings {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub period: Duration,
    pub stall_factor: u32,
}

impl Default for GlobeSettings {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            near: 1.0,
            far: 200.0,
            min_distance: 12.0,
            max_distance: 36.0,
            period: DEFAULT_PERIOD,
            stall_factor: DEFAULT_STALL_FACTOR,
        }
    }
}

enum Step {
    Frame(Option<Instant>),
    Tracker(TrackerEvent),
}

/// Camera position on a sphere around the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Orbit {
    distance: f64,
    polar: f64,
    azimuth: f64,
}

impl Orbit {
    fn position(&self) -> Point3<f64> {
        transform::from_spherical(self.distance, self.polar, self.azimuth)
    }
}

/// Free-camera view of the whole constellation around a rotating Earth.
pub struct GlobeView<B> {
    backend: B,
    camera: PerspectiveCamera,
    settings: GlobeSettings,
    orbit: Orbit,
    instances: InstanceLayer,
    earth: Option<MeshHandle>,
    sky: Option<MeshHandle>,
    earth_angle: f64,
    last_frame: Option<Instant>,
    watchdog: StallWatchdog,
    stalled: bool,
    tracker: Option<Subscription<TrackerEvent>>,
    ready_signalled: bool,
}

impl<B: RenderBackend> GlobeView<B> {
    pub fn new(backend: B, width: u32, height: u32, settings: GlobeSettings) -> Self {
        let mut camera =
            PerspectiveCamera::new(settings.fov_y_deg, 1.0, settings.near, settings.far);
        camera.set_aspect(width, height);
        let orbit = Orbit {
            distance: settings.max_distance,
            polar: FRAC_PI_2,
            azimuth: FRAC_PI_2,
        };
        let watchdog = StallWatchdog::new(settings.period, settings.stall_factor, Instant::now());
        let mut view = Self {
            backend,
            camera,
            settings,
            orbit,
            instances: InstanceLayer::new(GLOBE_SCALE),
            earth: None,
            sky: None,
            earth_angle: 0.0,
            last_frame: None,
            watchdog,
            stalled: false,
            tracker: None,
            ready_signalled: false,
        };
        view.place_camera();
        view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn instances(&self) -> &InstanceLayer {
        &self.instances
    }

    pub fn earth_angle(&self) -> f64 {
        self.earth_angle
    }

    pub fn camera_distance(&self) -> f64 {
        self.orbit.distance
    }

    pub fn is_attached(&self) -> bool {
        self.tracker.is_some()
    }

    /// Allocate the globe and sky, subscribe to ticks and set the tracker to
    /// the globe's period. Readiness is reported once the scene exists.
    pub fn attach(&mut self, session: &mut Session) -> Result<(), SceneError> {
        if self.earth.is_none() {
            self.earth = Some(self.backend.allocate_mesh(&Geometry::Globe {
                radius: EARTH_RADIUS_KM,
            })?);
        }
        if self.sky.is_none() {
            let sky = self
                .backend
                .allocate_mesh(&Geometry::Globe { radius: SKY_RADIUS })?;
            let turned = Rotation3::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
            self.backend.set_transform(sky, &turned.to_homogeneous());
            self.sky = Some(sky);
        }
        self.update_earth();

        self.tracker = Some(session.tracker.subscribe());
        session.tracker.update_period(self.settings.period);
        self.watchdog.set_period(self.settings.period, Instant::now());
        self.stalled = false;

        if !self.ready_signalled {
            session.readiness.signal_ready(ReadinessSource::Page, true);
            self.ready_signalled = true;
        }
        log::info!("Globe view attached (period {:?})", self.settings.period);
        Ok(())
    }

    pub fn handle_tracker(&mut self, event: TrackerEvent, now: Instant) {
        match event {
            TrackerEvent::Tick(payload) => {
                self.watchdog.record_tick(now);
                self.stalled = false;
                if let Err(e) = self.instances.update(&payload, &mut self.backend) {
                    log::warn!("Failed to update globe markers: {}", e);
                }
            }
            TrackerEvent::Unavailable(reason) => {
                log::warn!("Tracker unavailable: {}", reason);
                self.instances.clear(&mut self.backend);
            }
        }
    }

    /// Rotate the camera around the globe. Angles in radians.
    pub fn orbit(&mut self, delta_azimuth: f64, delta_polar: f64) {
        self.orbit.azimuth = (self.orbit.azimuth + delta_azimuth).rem_euclid(TAU);
        self.orbit.polar = (self.orbit.polar + delta_polar).clamp(MIN_POLAR, PI - MIN_POLAR);
        self.place_camera();
    }

    /// Scale the camera distance; values below one move closer.
    pub fn zoom(&mut self, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            return;
        }
        self.orbit.distance = (self.orbit.distance * scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);
        self.place_camera();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Advance the Earth's rotation by the time since the previous frame and
    /// draw. A stalled tracker leaves the globe empty until the next tick.
    pub fn render_frame(&mut self, now: Instant) -> FrameStats {
        if !self.stalled && self.watchdog.is_stalled(now) {
            log::warn!(
                "No tracker tick within {:?}, hiding globe markers",
                self.watchdog.timeout()
            );
            self.stalled = true;
            self.instances.clear(&mut self.backend);
        }
        if let Some(last) = self.last_frame {
            let elapsed = now.saturating_duration_since(last).as_secs_f64();
            self.earth_angle = (self.earth_angle + EARTH_RATE_RAD_S * elapsed).rem_euclid(TAU);
        }
        self.last_frame = Some(now);
        self.update_earth();
        self.backend.draw(&self.camera);
        FrameStats {
            objects: self.instances.count(),
            labels: 0,
        }
    }

    pub fn pump(&mut self) -> usize {
        let events = match self.tracker.as_mut() {
            Some(sub) => sub.drain(),
            None => return 0,
        };
        let handled = events.len();
        let now = Instant::now();
        for event in events {
            self.handle_tracker(event, now);
        }
        handled
    }

    pub async fn run(&mut self, frames: &mut FrameLoop) {
        loop {
            let step = {
                let Some(tracker) = self.tracker.as_mut() else {
                    return;
                };
                tokio::select! {
                    frame = frames.next_frame() => Step::Frame(frame),
                    Some(event) = tracker.recv() => Step::Tracker(event),
                }
            };
            match step {
                Step::Frame(Some(at)) => {
                    self.render_frame(at);
                }
                Step::Frame(None) => {
                    log::debug!("Globe frame loop cancelled after {} frames", frames.frames());
                    return;
                }
                Step::Tracker(event) => self.handle_tracker(event, Instant::now()),
            }
        }
    }

    pub fn detach(&mut self) {
        self.tracker = None;
        self.instances.clear(&mut self.backend);
        for mesh in [self.earth.take(), self.sky.take()].into_iter().flatten() {
            self.backend.release_mesh(mesh);
        }
        self.backend.dispose();
        log::info!("Globe view detached");
    }

    fn place_camera(&mut self) {
        self.camera.position = self.orbit.position();
        self.camera.look_at(&Point3::origin(), &Vector3::y());
    }

    /// Earth frame: spin about the polar axis, km to scene units. Markers
    /// are parented to it.
    fn update_earth(&mut self) {
        let spin =
            Rotation3::from_axis_angle(&Vector3::y_axis(), self.earth_angle).to_homogeneous();
        if let Some(earth) = self.earth {
            let world = spin * Matrix4::new_scaling(GLOBE_SCALE);
            self.backend.set_transform(earth, &world);
        }
        self.instances.set_transform(spin, &mut self.backend);
    }
}
