use tokio::sync::mpsc;

use super::capability::{CapabilityLevel, Liveness};
use super::device::{DeviceEvent, DeviceMessage, DeviceSink, SensorBackend, SensorDevice};
use super::error::SensorError;
use super::types::{
    OrientationSample, OrientationSource, RawSample, SensorEvent, SensorKind, SensorState,
    SensorUpdate,
};
use crate::propagation::ObserverCoordinate;
use crate::pubsub::{Channel, Subscription};

struct Slot {
    state: SensorState,
    live: bool,
    generation: u64,
    device: Option<Box<dyn SensorDevice>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: SensorState::Undiscovered,
            live: false,
            generation: 0,
            device: None,
        }
    }

    fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.stop();
        }
    }
}

/// Owns every sensor device and turns raw device events into typed readings,
/// liveness changes and capability labels.
pub struct SensorManager {
    backend: Box<dyn SensorBackend>,
    slots: [Slot; 3],
    device_tx: mpsc::UnboundedSender<DeviceMessage>,
    device_rx: mpsc::UnboundedReceiver<DeviceMessage>,
    nine_axis: Channel<SensorEvent<OrientationSample>>,
    six_axis: Channel<SensorEvent<OrientationSample>>,
    geolocation: Channel<SensorEvent<ObserverCoordinate>>,
    capability_tx: Channel<CapabilityLevel>,
    updates: Channel<SensorUpdate>,
    capability: CapabilityLevel,
}

impl SensorManager {
    pub fn new(backend: Box<dyn SensorBackend>) -> Self {
        let (device_tx, device_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            slots: [Slot::new(), Slot::new(), Slot::new()],
            device_tx,
            device_rx,
            nine_axis: Channel::with_capacity(256),
            six_axis: Channel::with_capacity(256),
            geolocation: Channel::new(),
            capability_tx: Channel::new(),
            updates: Channel::with_capacity(512),
            capability: CapabilityLevel::Off,
        }
    }

    pub fn state(&self, kind: SensorKind) -> SensorState {
        self.slot(kind).state
    }

    pub fn is_live(&self, kind: SensorKind) -> bool {
        self.slot(kind).live
    }

    pub fn liveness(&self) -> Liveness {
        Liveness {
            absolute: self.is_live(SensorKind::NineAxis),
            relative: self.is_live(SensorKind::SixAxis),
            geolocation: self.is_live(SensorKind::Geolocation),
        }
    }

    pub fn capability(&self) -> CapabilityLevel {
        self.capability
    }

    pub fn subscribe_capability(&self) -> Subscription<CapabilityLevel> {
        self.capability_tx.subscribe()
    }

    pub fn subscribe_orientation(
        &self,
        source: OrientationSource,
    ) -> Subscription<SensorEvent<OrientationSample>> {
        match source {
            OrientationSource::NineAxis => self.nine_axis.subscribe(),
            OrientationSource::SixAxis => self.six_axis.subscribe(),
        }
    }

    pub fn subscribe_geolocation(&self) -> Subscription<SensorEvent<ObserverCoordinate>> {
        self.geolocation.subscribe()
    }

    /// Every reading, liveness change and capability label on one stream,
    /// in publication order.
    pub fn subscribe_updates(&self) -> Subscription<SensorUpdate> {
        self.updates.subscribe()
    }

    /// Try to acquire and start the device for `kind`. Only undiscovered or
    /// errored sensors are (re)acquired; a sensor found unavailable stays
    /// that way.
    pub fn request_activation(&mut self, kind: SensorKind) -> SensorState {
        let state = self.slot(kind).state;
        if !matches!(state, SensorState::Undiscovered | SensorState::Errored) {
            log::debug!("Sensor {} already {}, not activating", kind, state);
            return state;
        }

        let generation = self.slot(kind).generation + 1;
        let sink = DeviceSink::new(kind, generation, self.device_tx.clone());
        let started = self.backend.acquire(kind).and_then(|mut device| {
            device.start(sink)?;
            Ok(device)
        });

        let slot = self.slot_mut(kind);
        slot.generation = generation;
        match started {
            Ok(device) => {
                log::info!("Sensor {} active", kind);
                slot.state = SensorState::Active;
                slot.device = Some(device);
                SensorState::Active
            }
            Err(e) => {
                log::warn!("Sensor {} unavailable: {}", kind, e);
                slot.state = SensorState::Unavailable;
                self.set_liveness(kind, false);
                SensorState::Unavailable
            }
        }
    }

    /// Wait for the next raw device event.
    pub async fn next_device_event(&mut self) -> Option<DeviceMessage> {
        self.device_rx.recv().await
    }

    /// Apply every queued device event without waiting.
    pub fn drain_device_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.device_rx.try_recv() {
            self.handle_device_event(message);
            handled += 1;
        }
        handled
    }

    pub fn handle_device_event(&mut self, message: DeviceMessage) {
        let DeviceMessage {
            kind,
            generation,
            event,
        } = message;
        let slot = self.slot(kind);
        if slot.generation != generation || slot.state != SensorState::Active {
            log::trace!("Dropping stale {} event", kind);
            return;
        }

        match event {
            DeviceEvent::Sample(sample) => {
                if !self.slot(kind).live {
                    self.set_liveness(kind, true);
                }
                self.publish_reading(kind, sample);
            }
            DeviceEvent::Fault(message) => {
                let err = SensorError::Fault { kind, message };
                log::warn!("{}", err);
                let slot = self.slot_mut(kind);
                slot.state = SensorState::Errored;
                slot.release();
                self.set_liveness(kind, false);
            }
        }
    }

    /// Stop every device. Sensors return to undiscovered.
    pub fn shutdown(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.release();
            slot.state = SensorState::Undiscovered;
            slot.live = false;
        }
        self.capability = CapabilityLevel::Off;
    }

    fn publish_reading(&self, kind: SensorKind, sample: RawSample) {
        match (kind, sample) {
            (SensorKind::NineAxis, RawSample::Orientation(s)) => {
                self.publish_orientation(OrientationSource::NineAxis, SensorEvent::Reading(s))
            }
            (SensorKind::SixAxis, RawSample::Orientation(s)) => {
                self.publish_orientation(OrientationSource::SixAxis, SensorEvent::Reading(s))
            }
            (SensorKind::Geolocation, RawSample::Position(p)) => {
                self.publish_geolocation(SensorEvent::Reading(p))
            }
            (kind, sample) => log::warn!("Sensor {} produced mismatched sample {:?}", kind, sample),
        }
    }

    fn publish_orientation(
        &self,
        source: OrientationSource,
        event: SensorEvent<OrientationSample>,
    ) {
        match source {
            OrientationSource::NineAxis => self.nine_axis.publish(event.clone()),
            OrientationSource::SixAxis => self.six_axis.publish(event.clone()),
        }
        self.updates.publish(SensorUpdate::Orientation(source, event));
    }

    fn publish_geolocation(&self, event: SensorEvent<ObserverCoordinate>) {
        self.geolocation.publish(event.clone());
        self.updates.publish(SensorUpdate::Geolocation(event));
    }

    fn set_liveness(&mut self, kind: SensorKind, live: bool) {
        self.slot_mut(kind).live = live;
        match kind {
            SensorKind::NineAxis => {
                self.publish_orientation(OrientationSource::NineAxis, SensorEvent::Liveness(live))
            }
            SensorKind::SixAxis => {
                self.publish_orientation(OrientationSource::SixAxis, SensorEvent::Liveness(live))
            }
            SensorKind::Geolocation => self.publish_geolocation(SensorEvent::Liveness(live)),
        }

        self.capability = self.liveness().classify();
        log::debug!("Capability {} after {} liveness {}", self.capability, kind, live);
        self.capability_tx.publish(self.capability);
        self.updates.publish(SensorUpdate::Capability(self.capability));
    }

    fn slot(&self, kind: SensorKind) -> &Slot {
        &self.slots[kind.index()]
    }

    fn slot_mut(&mut self, kind: SensorKind) -> &mut Slot {
        &mut self.slots[kind.index()]
    }
}

impl Drop for SensorManager {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.release();
        }
    }
}
