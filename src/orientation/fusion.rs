use nalgebra::{Quaternion, Unit, UnitQuaternion};
use std::f64::consts::FRAC_PI_2;

use super::euler::EulerXyz;
use crate::sensor::{OrientationSample, OrientationSource};

/// Device frame to scene frame: devices report attitude with the screen
/// facing up; the scene camera looks along the horizon.
const PITCH_OFFSET_RAD: f64 = FRAC_PI_2;
const MIN_QUATERNION_NORM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    pub quaternion: UnitQuaternion<f64>,
    pub euler: EulerXyz,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            quaternion: UnitQuaternion::identity(),
            euler: EulerXyz::default(),
        }
    }
}

impl OrientationState {
    /// Replace the attitude with a corrected raw sample. Only the pitch axis
    /// (and heading, when `heading_offset_rad` is set) is adjusted; the
    /// correction goes through Euler angles so the other axes are untouched.
    fn apply(&mut self, raw: [f64; 4], heading_offset_rad: f64) -> bool {
        let [x, y, z, w] = raw;
        let Some(q) = Unit::try_new(Quaternion::new(w, x, y, z), MIN_QUATERNION_NORM) else {
            return false;
        };
        let euler = EulerXyz::from_quaternion(&q);
        let corrected = EulerXyz::new(euler.x - PITCH_OFFSET_RAD, euler.y - heading_offset_rad, euler.z);
        self.euler = corrected;
        self.quaternion = corrected.to_quaternion();
        true
    }
}

/// Keeps one attitude per orientation source and picks which one drives the
/// camera.
#[derive(Debug, Clone)]
pub struct OrientationFusion {
    nine_axis: OrientationState,
    six_axis: OrientationState,
    primary: OrientationSource,
}

impl Default for OrientationFusion {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationFusion {
    pub fn new() -> Self {
        Self {
            nine_axis: OrientationState::default(),
            six_axis: OrientationState::default(),
            primary: OrientationSource::NineAxis,
        }
    }

    pub fn primary(&self) -> OrientationSource {
        self.primary
    }

    pub fn state(&self, source: OrientationSource) -> &OrientationState {
        match source {
            OrientationSource::NineAxis => &self.nine_axis,
            OrientationSource::SixAxis => &self.six_axis,
        }
    }

    /// Attitude the render loop should use this frame.
    pub fn primary_quaternion(&self) -> UnitQuaternion<f64> {
        self.state(self.primary).quaternion
    }

    /// Returns `false` for samples that do not describe a rotation.
    pub fn update(&mut self, source: OrientationSource, sample: &OrientationSample) -> bool {
        let applied = match source {
            OrientationSource::NineAxis => self.nine_axis.apply(sample.quaternion, 0.0),
            OrientationSource::SixAxis => self
                .six_axis
                .apply(sample.quaternion, sample.heading_offset_rad),
        };
        if !applied {
            log::debug!("Dropping degenerate {} sample {:?}", source, sample.quaternion);
        }
        applied
    }

    /// Primary-source fallback. Only the absolute source's liveness moves the
    /// primary: losing it while the overlay is enabled falls back to the
    /// relative source, regaining it always switches back.
    pub fn on_liveness(&mut self, source: OrientationSource, live: bool, overlay_enabled: bool) {
        if source != OrientationSource::NineAxis {
            return;
        }
        let next = match (live, overlay_enabled) {
            (true, _) => OrientationSource::NineAxis,
            (false, true) => OrientationSource::SixAxis,
            (false, false) => self.primary,
        };
        if next != self.primary {
            log::info!("Primary orientation source {} -> {}", self.primary, next);
            self.primary = next;
        }
    }
}
