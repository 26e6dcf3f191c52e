use nalgebra::Point3;
use std::time::Duration;
use tokio::time::Instant;

use super::frame::FrameLoop;
use super::{FrameStats, Session};
use crate::hud::{self, LabelSurface};
use crate::orientation::OrientationFusion;
use crate::propagation::{
    ObserverCoordinate, PropagationChannel, StallWatchdog, TrackerEvent, DEFAULT_STALL_FACTOR,
};
use crate::pubsub::Subscription;
use crate::readiness::{ReadinessSignal, ReadinessSource};
use crate::scene::{RenderBackend, RenderObjectPool};
use crate::sensor::{
    CapabilityLevel, DeviceMessage, OrientationSample, OrientationSource, SensorEvent, SensorKind,
    SensorUpdate,
};
use crate::transform::PerspectiveCamera;

const CAMERA_NEAR: f64 = 1e-6;
const CAMERA_FAR: f64 = 5000.0;

#[derive(Debug, Clone)]
pub struct ArSettings {
    pub fov_y_deg: f64,
    /// Tick period requested from the tracker while attached.
    pub period: Duration,
    pub stall_factor: u32,
}

impl Default for ArSettings {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            period: Duration::from_millis(100),
            stall_factor: DEFAULT_STALL_FACTOR,
        }
    }
}

/// Sensor output arrives on one ordered stream: an orientation loss must be
/// seen before the capability drop it causes.
struct Subscriptions {
    sensors: Subscription<SensorUpdate>,
    tracker: Subscription<TrackerEvent>,
}

enum Step {
    Frame(Instant),
    Device(DeviceMessage),
    Sensor(SensorUpdate),
    Tracker(TrackerEvent),
    Stop,
}

/// Viewfinder overlay: markers and labels for every target above the
/// horizon, drawn from the observer's position with the device's attitude.
pub struct ArView<B, S> {
    backend: B,
    surface: S,
    camera: PerspectiveCamera,
    pool: RenderObjectPool,
    fusion: OrientationFusion,
    settings: ArSettings,
    camera_available: bool,
    enabled: bool,
    watchdog: StallWatchdog,
    stalled: bool,
    subs: Option<Subscriptions>,
    ready_signalled: bool,
}

impl<B: RenderBackend, S: LabelSurface> ArView<B, S> {
    pub fn new(backend: B, surface: S, settings: ArSettings) -> Self {
        let (width, height) = surface.size();
        let mut camera = PerspectiveCamera::new(settings.fov_y_deg, 1.0, CAMERA_NEAR, CAMERA_FAR);
        camera.set_aspect(width, height);
        camera.position = Point3::new(0.0, 0.0, CAMERA_NEAR);
        Self {
            backend,
            surface,
            camera,
            pool: RenderObjectPool::default(),
            fusion: OrientationFusion::new(),
            watchdog: StallWatchdog::new(settings.period, settings.stall_factor, Instant::now()),
            settings,
            camera_available: false,
            enabled: false,
            stalled: false,
            subs: None,
            ready_signalled: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pool(&self) -> &RenderObjectPool {
        &self.pool
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn fusion(&self) -> &OrientationFusion {
        &self.fusion
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_attached(&self) -> bool {
        self.subs.is_some()
    }

    /// Wire the view to the session. Subscriptions are taken before the
    /// sensors are activated so that activation results are not missed.
    pub fn attach(&mut self, session: &mut Session, camera_available: bool) {
        self.camera_available = camera_available;
        if !camera_available {
            self.enabled = false;
        }

        self.subs = Some(Subscriptions {
            sensors: session.sensors.subscribe_updates(),
            tracker: session.tracker.subscribe(),
        });
        for kind in SensorKind::ALL {
            session.sensors.request_activation(kind);
        }

        session.tracker.update_period(self.settings.period);
        self.watchdog.set_period(self.settings.period, Instant::now());
        self.stalled = false;

        if !self.ready_signalled {
            session.readiness.signal_ready(ReadinessSource::Page, true);
            self.ready_signalled = true;
        }
        log::info!(
            "AR view attached (camera {}, period {:?})",
            if camera_available { "available" } else { "missing" },
            self.settings.period
        );
    }

    /// Without a camera feed the overlay stays off whatever the sensors say.
    /// Partial capability leaves the current state alone.
    pub fn handle_capability(&mut self, level: CapabilityLevel) {
        if !self.camera_available {
            self.enabled = false;
            return;
        }
        match level {
            CapabilityLevel::Full => self.enabled = true,
            CapabilityLevel::NoHeading | CapabilityLevel::NoPosition => {}
            CapabilityLevel::NoOrientation | CapabilityLevel::Off => self.enabled = false,
        }
        log::debug!("Capability {}, overlay enabled: {}", level, self.enabled);
    }

    pub fn handle_orientation(
        &mut self,
        source: OrientationSource,
        event: SensorEvent<OrientationSample>,
    ) {
        match event {
            SensorEvent::Liveness(live) => self.fusion.on_liveness(source, live, self.enabled),
            SensorEvent::Reading(sample) => {
                self.fusion.update(source, &sample);
            }
        }
    }

    pub fn handle_geolocation(
        &mut self,
        event: SensorEvent<ObserverCoordinate>,
        tracker: &mut PropagationChannel,
    ) {
        if let SensorEvent::Reading(observer) = event {
            tracker.update_observer(observer);
        }
    }

    pub fn handle_sensor(&mut self, update: SensorUpdate, tracker: &mut PropagationChannel) {
        match update {
            SensorUpdate::Capability(level) => self.handle_capability(level),
            SensorUpdate::Orientation(source, event) => self.handle_orientation(source, event),
            SensorUpdate::Geolocation(event) => self.handle_geolocation(event, tracker),
        }
    }

    pub fn handle_tracker(&mut self, event: TrackerEvent, now: Instant) {
        match event {
            TrackerEvent::Tick(payload) => {
                self.watchdog.record_tick(now);
                self.stalled = false;
                match self.pool.apply(&payload, &mut self.backend) {
                    Ok(visible) => log::trace!("{} of {} targets visible", visible, payload.len()),
                    Err(e) => log::warn!("Failed to update markers: {}", e),
                }
            }
            TrackerEvent::Unavailable(reason) => {
                log::warn!("Tracker unavailable: {}", reason);
                self.pool.clear(&mut self.backend);
            }
        }
    }

    /// Draw one frame from the latest fused attitude and pool contents.
    pub fn render_frame(&mut self, now: Instant) -> FrameStats {
        if !self.stalled && self.watchdog.is_stalled(now) {
            log::warn!(
                "No tracker tick within {:?}, hiding targets",
                self.watchdog.timeout()
            );
            self.stalled = true;
            self.pool.clear(&mut self.backend);
        }

        self.camera.orientation = self.fusion.primary_quaternion();
        self.backend.draw(&self.camera);
        let labels = hud::compose(&mut self.surface, &self.camera, &self.pool);
        FrameStats {
            objects: self.pool.len(),
            labels,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        self.camera.set_aspect(width, height);
    }

    /// Handle everything already queued without waiting. Returns the number
    /// of events applied.
    pub fn pump(&mut self, session: &mut Session) -> usize {
        let mut handled = session.sensors.drain_device_events();
        let Some(subs) = self.subs.as_mut() else {
            return handled;
        };
        let sensors = subs.sensors.drain();
        let tracker = subs.tracker.drain();
        handled += sensors.len() + tracker.len();

        for update in sensors {
            self.handle_sensor(update, &mut session.tracker);
        }
        let now = Instant::now();
        for event in tracker {
            self.handle_tracker(event, now);
        }
        handled
    }

    /// Event loop for an attached view. Returns once the frame loop is
    /// cancelled.
    pub async fn run(&mut self, session: &mut Session, frames: &mut FrameLoop) {
        loop {
            let step = {
                let Some(subs) = self.subs.as_mut() else {
                    return;
                };
                let sensors = &mut session.sensors;
                tokio::select! {
                    biased;
                    Some(update) = subs.sensors.recv() => Step::Sensor(update),
                    Some(message) = sensors.next_device_event() => Step::Device(message),
                    Some(event) = subs.tracker.recv() => Step::Tracker(event),
                    frame = frames.next_frame() => match frame {
                        Some(at) => Step::Frame(at),
                        None => Step::Stop,
                    },
                }
            };

            match step {
                Step::Frame(at) => {
                    self.render_frame(at);
                }
                Step::Device(message) => session.sensors.handle_device_event(message),
                Step::Sensor(update) => self.handle_sensor(update, &mut session.tracker),
                Step::Tracker(event) => self.handle_tracker(event, Instant::now()),
                Step::Stop => {
                    log::debug!("AR frame loop cancelled after {} frames", frames.frames());
                    return;
                }
            }
        }
    }

    /// Drop every subscription and give all scene resources back.
    pub fn detach(&mut self) {
        self.subs = None;
        self.pool.clear(&mut self.backend);
        self.surface.clear();
        self.backend.dispose();
        log::info!("AR view detached");
    }
}
