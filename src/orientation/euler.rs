use nalgebra::{Quaternion, UnitQuaternion};

/// Intrinsic X-then-Y-then-Z Euler angles, in radians. The rotation is
/// `Rx(x) · Ry(y) · Rz(z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerXyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EulerXyz {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_quaternion(q: &UnitQuaternion<f64>) -> Self {
        let m = q.to_rotation_matrix();
        let m = m.matrix();
        let m13 = m[(0, 2)].clamp(-1.0, 1.0);
        let y = m13.asin();
        if m13.abs() < 0.999_999_9 {
            Self {
                x: (-m[(1, 2)]).atan2(m[(2, 2)]),
                y,
                z: (-m[(0, 1)]).atan2(m[(0, 0)]),
            }
        } else {
            // Gimbal lock: fold all roll into x.
            Self {
                x: m[(2, 1)].atan2(m[(1, 1)]),
                y,
                z: 0.0,
            }
        }
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        let (s1, c1) = (self.x / 2.0).sin_cos();
        let (s2, c2) = (self.y / 2.0).sin_cos();
        let (s3, c3) = (self.z / 2.0).sin_cos();
        UnitQuaternion::from_quaternion(Quaternion::new(
            c1 * c2 * c3 - s1 * s2 * s3,
            s1 * c2 * c3 + c1 * s2 * s3,
            c1 * s2 * c3 - s1 * c2 * s3,
            c1 * c2 * s3 + s1 * s2 * c3,
        ))
    }
}
