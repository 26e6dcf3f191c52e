use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::error::TrackerError;

/// One catalog entry in CelesTrak GP (OMM JSON) form.
#[derive(Debug, Clone, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ElementSet {
    pub object_name: String,
    pub object_id: String,
    pub epoch: String,
    pub mean_motion: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ra_of_asc_node: f64,
    pub arg_of_pericenter: f64,
    pub mean_anomaly: f64,
    #[serde(default)]
    pub ephemeris_type: u8,
    #[serde(default = "default_classification")]
    pub classification_type: String,
    pub norad_cat_id: u64,
    #[serde(default)]
    pub element_set_no: u64,
    #[serde(default)]
    pub rev_at_epoch: u64,
    pub bstar: f64,
    pub mean_motion_dot: f64,
    pub mean_motion_ddot: f64,
}

fn default_classification() -> String {
    "U".to_string()
}

/// Observer position. Serialized as `[lat_deg, lon_deg, alt_km]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct ObserverCoordinate {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

impl ObserverCoordinate {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_km,
        }
    }
}

impl From<[f64; 3]> for ObserverCoordinate {
    fn from([lat_deg, lon_deg, alt_km]: [f64; 3]) -> Self {
        Self::new(lat_deg, lon_deg, alt_km)
    }
}

impl From<ObserverCoordinate> for [f64; 3] {
    fn from(o: ObserverCoordinate) -> Self {
        [o.lat_deg, o.lon_deg, o.alt_km]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Horizontal {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl Horizontal {
    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TopocentricVelocity {
    pub east_km_s: f64,
    pub north_km_s: f64,
    pub up_km_s: f64,
}

/// State of one target at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetStateVector {
    pub name: String,
    pub geodetic: Geodetic,
    pub horizontal: Horizontal,
    pub velocity: TopocentricVelocity,
}

/// Borrowed view of one slot of a [`TickPayload`].
#[derive(Debug, Clone, Copy)]
pub struct TargetRef<'a> {
    pub name: &'a str,
    pub geodetic: &'a Geodetic,
    pub horizontal: &'a Horizontal,
    pub velocity: &'a TopocentricVelocity,
}

type RawTick = (
    Vec<Geodetic>,
    Vec<Horizontal>,
    Vec<TopocentricVelocity>,
    Vec<String>,
);

/// Output of one propagation tick: four index-aligned arrays.
///
/// On the wire this is `[geodetic[], horizontal[], velocity[], names[]]`.
/// Every constructor, including deserialization, rejects arrays of unequal
/// length.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawTick", into = "RawTick")]
pub struct TickPayload {
    geodetic: Vec<Geodetic>,
    horizontal: Vec<Horizontal>,
    velocity: Vec<TopocentricVelocity>,
    names: Vec<String>,
}

impl TickPayload {
    pub fn new(
        geodetic: Vec<Geodetic>,
        horizontal: Vec<Horizontal>,
        velocity: Vec<TopocentricVelocity>,
        names: Vec<String>,
    ) -> Result<Self, TrackerError> {
        let n = names.len();
        if geodetic.len() != n || horizontal.len() != n || velocity.len() != n {
            return Err(TrackerError::Misaligned {
                geodetic: geodetic.len(),
                horizontal: horizontal.len(),
                velocity: velocity.len(),
                names: n,
            });
        }
        Ok(Self {
            geodetic,
            horizontal,
            velocity,
            names,
        })
    }

    pub fn empty() -> Self {
        Self {
            geodetic: Vec::new(),
            horizontal: Vec::new(),
            velocity: Vec::new(),
            names: Vec::new(),
        }
    }

    pub fn from_states(states: Vec<TargetStateVector>) -> Self {
        let mut payload = Self::empty();
        for s in states {
            payload.geodetic.push(s.geodetic);
            payload.horizontal.push(s.horizontal);
            payload.velocity.push(s.velocity);
            payload.names.push(s.name);
        }
        payload
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn geodetic(&self) -> &[Geodetic] {
        &self.geodetic
    }

    pub fn horizontal(&self) -> &[Horizontal] {
        &self.horizontal
    }

    pub fn velocity(&self) -> &[TopocentricVelocity] {
        &self.velocity
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn targets(&self) -> impl Iterator<Item = TargetRef<'_>> {
        (0..self.len()).map(move |i| TargetRef {
            name: &self.names[i],
            geodetic: &self.geodetic[i],
            horizontal: &self.horizontal[i],
            velocity: &self.velocity[i],
        })
    }

    /// Targets above the local horizon, in slot order.
    pub fn visible(&self) -> impl Iterator<Item = TargetRef<'_>> {
        self.targets().filter(|t| t.horizontal.is_above_horizon())
    }
}

impl TryFrom<RawTick> for TickPayload {
    type Error = TrackerError;

    fn try_from((geodetic, horizontal, velocity, names): RawTick) -> Result<Self, Self::Error> {
        TickPayload::new(geodetic, horizontal, velocity, names)
    }
}

impl From<TickPayload> for RawTick {
    fn from(p: TickPayload) -> Self {
        (p.geodetic, p.horizontal, p.velocity, p.names)
    }
}

/// Inbound message of the worker protocol. Any subset of fields may be set:
/// `gpElements` (re)initializes, `coords` alone moves the observer, `period`
/// alone reschedules ticks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorkerCommand {
    #[serde(rename = "gpElements", default, skip_serializing_if = "Option::is_none")]
    pub gp_elements: Option<Vec<ElementSet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<ObserverCoordinate>,
    /// Tick period in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u64>,
}

impl WorkerCommand {
    pub fn init(elements: Vec<ElementSet>, observer: ObserverCoordinate, period: Duration) -> Self {
        Self {
            gp_elements: Some(elements),
            coords: Some(observer),
            period: Some(duration_to_ms(period)),
        }
    }

    pub fn observer(observer: ObserverCoordinate) -> Self {
        Self {
            coords: Some(observer),
            ..Default::default()
        }
    }

    pub fn period(period: Duration) -> Self {
        Self {
            period: Some(duration_to_ms(period)),
            ..Default::default()
        }
    }

    pub fn period_duration(&self) -> Option<Duration> {
        self.period.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    d.as_millis().max(1) as u64
}

/// Event stream delivered to consumers of a [`super::PropagationChannel`].
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Tick(Arc<TickPayload>),
    /// Terminal: the session could not be initialised.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrackerMode {
    Idle,
    Starting,
    Ready { targets: usize },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub mode: TrackerMode,
    pub session: Option<Uuid>,
    pub period_ms: u64,
    pub ticks: u64,
}
