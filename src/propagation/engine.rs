//! SGP4 propagation engine.
//!
//! The engine only ever sees the worker; consumers talk to it through the
//! command protocol in [`super::worker`].

use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use super::error::TrackerError;
use super::geodesy::{
    ecef_to_enu, ecef_to_geodetic, norm, observer_ecef_km, observer_velocity_ecef_km_s, sub,
    teme_to_ecef_position, teme_to_ecef_velocity,
};
use super::types::{ElementSet, Geodetic, Horizontal, ObserverCoordinate, TopocentricVelocity};

struct Entry {
    norad_id: u64,
    elements: Elements,
    constants: Constants,
}

/// Position and velocity of one engine slot at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineState {
    pub geodetic: Geodetic,
    pub horizontal: Horizontal,
    pub velocity: TopocentricVelocity,
}

impl EngineState {
    /// Placeholder for an object that failed to propagate. NaN elevation never
    /// passes the horizon filter.
    pub fn unavailable() -> Self {
        Self {
            geodetic: Geodetic {
                lat_deg: f64::NAN,
                lon_deg: f64::NAN,
                alt_km: f64::NAN,
            },
            horizontal: Horizontal {
                azimuth_deg: f64::NAN,
                elevation_deg: f64::NAN,
                range_km: f64::NAN,
            },
            velocity: TopocentricVelocity {
                east_km_s: f64::NAN,
                north_km_s: f64::NAN,
                up_km_s: f64::NAN,
            },
        }
    }
}

pub struct PropagationEngine {
    entries: Vec<Entry>,
    observer: ObserverCoordinate,
}

impl PropagationEngine {
    /// Build SGP4 constants for every element set. Entries that SGP4 rejects
    /// are skipped; an engine with nothing left is an error.
    pub fn new(
        element_sets: &[ElementSet],
        observer: ObserverCoordinate,
    ) -> Result<Self, TrackerError> {
        let mut entries = Vec::with_capacity(element_sets.len());
        for set in element_sets {
            match to_sgp4(set) {
                Ok((elements, constants)) => entries.push(Entry {
                    norad_id: set.norad_cat_id,
                    elements,
                    constants,
                }),
                Err(e) => {
                    log::warn!(
                        "Skipping {} ({}): {}",
                        set.object_name,
                        set.norad_cat_id,
                        e
                    );
                }
            }
        }

        if entries.is_empty() {
            return Err(TrackerError::NoElements);
        }

        entries.sort_by_key(|e| e.norad_id);
        entries.dedup_by_key(|e| e.norad_id);

        Ok(Self { entries, observer })
    }

    /// Catalog ids in engine slot order.
    pub fn norad_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.norad_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn observer(&self) -> ObserverCoordinate {
        self.observer
    }

    pub fn set_observer(&mut self, observer: ObserverCoordinate) {
        self.observer = observer;
    }

    /// Propagate every slot to `at`. The result is index-aligned with
    /// [`PropagationEngine::norad_ids`].
    pub fn propagate(&self, at: DateTime<Utc>) -> Vec<EngineState> {
        self.entries
            .iter()
            .map(|entry| match propagate_entry(entry, &self.observer, at) {
                Ok(state) => state,
                Err(e) => {
                    log::debug!("Propagation of {} failed: {}", entry.norad_id, e);
                    EngineState::unavailable()
                }
            })
            .collect()
    }
}

fn to_sgp4(set: &ElementSet) -> Result<(Elements, Constants), TrackerError> {
    let elements: Elements = serde_json::from_value(serde_json::to_value(set)?)?;
    let constants = Constants::from_elements(&elements)?;
    Ok((elements, constants))
}

fn propagate_entry(
    entry: &Entry,
    observer: &ObserverCoordinate,
    at: DateTime<Utc>,
) -> Result<EngineState, TrackerError> {
    let naive = at.naive_utc();
    let minutes = entry
        .elements
        .datetime_to_minutes_since_epoch(&naive)
        .map_err(|e| TrackerError::Propagation(e.to_string()))?;
    let prediction = entry.constants.propagate(minutes)?;

    let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&naive));
    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let sat_vel_ecef = teme_to_ecef_velocity(prediction.position, prediction.velocity, sidereal);

    Ok(observe(sat_ecef, sat_vel_ecef, observer))
}

/// Resolve an ECEF state into observer-relative quantities.
pub fn observe(
    sat_ecef: [f64; 3],
    sat_vel_ecef: [f64; 3],
    observer: &ObserverCoordinate,
) -> EngineState {
    let lat = observer.lat_deg.to_radians();
    let lon = observer.lon_deg.to_radians();

    let dr = sub(sat_ecef, observer_ecef_km(observer));
    let range_km = norm(dr);
    let (east, north, up) = ecef_to_enu(dr, lat, lon);
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        0.0
    };

    let rel_vel = sub(sat_vel_ecef, observer_velocity_ecef_km_s(observer));
    let (east_km_s, north_km_s, up_km_s) = ecef_to_enu(rel_vel, lat, lon);

    EngineState {
        geodetic: ecef_to_geodetic(sat_ecef),
        horizontal: Horizontal {
            azimuth_deg,
            elevation_deg,
            range_km,
        },
        velocity: TopocentricVelocity {
            east_km_s,
            north_km_s,
            up_km_s,
        },
    }
}
