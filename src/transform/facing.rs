use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3,
};
use std::f64::consts::FRAC_PI_2;

/// Rotation whose +Z axis points along `direction`, with +Y as close to `up`
/// as possible. Degenerate inputs are nudged instead of producing NaNs.
pub fn look_rotation(direction: &Vector3<f64>, up: &Vector3<f64>) -> UnitQuaternion<f64> {
    let mut z = *direction;
    if z.norm_squared() == 0.0 {
        z.z = 1.0;
    }
    z.normalize_mut();

    let mut x = up.cross(&z);
    if x.norm_squared() == 0.0 {
        if (up.z.abs() - 1.0).abs() < f64::EPSILON {
            z.x += 1e-4;
        } else {
            z.z += 1e-4;
        }
        z.normalize_mut();
        x = up.cross(&z);
    }
    x.normalize_mut();
    let y = z.cross(&x);

    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        Matrix3::from_columns(&[x, y, z]),
    ))
}

/// Orientation of a flat marker moving with `velocity`: look along the
/// velocity, then turn the marker's plane to face that direction.
pub fn facing(velocity: &Vector3<f64>) -> UnitQuaternion<f64> {
    look_rotation(velocity, &Vector3::y())
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2)
}

/// World matrix for a marker at `position` with `rotation`.
pub fn bake(position: &Point3<f64>, rotation: &UnitQuaternion<f64>) -> Matrix4<f64> {
    Isometry3::from_parts(Translation3::from(position.coords), *rotation).to_homogeneous()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_points_z_along_direction() {
        let dir = Vector3::new(1.0, 2.0, -3.0);
        let q = look_rotation(&dir, &Vector3::y());
        let z = q * Vector3::z();
        assert!((z - dir.normalize()).norm() < 1e-12);
        let y = q * Vector3::y();
        assert!(y.y > 0.0);
    }

    #[test]
    fn vertical_direction_does_not_degenerate() {
        let q = look_rotation(&Vector3::new(0.0, 5.0, 0.0), &Vector3::y());
        let v = q * Vector3::new(1.0, 1.0, 1.0);
        assert!(v.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn zero_velocity_faces_default_forward() {
        let q = look_rotation(&Vector3::zeros(), &Vector3::y());
        assert!(q.angle() < 1e-12);
    }

    #[test]
    fn marker_tip_points_along_velocity() {
        // The marker's tip is its local +Y.
        let v = Vector3::new(0.0, 0.0, -7.5);
        let q = facing(&v);
        let tip = q * Vector3::y();
        assert!((tip - v.normalize()).norm() < 1e-9, "{tip}");
    }

    #[test]
    fn bake_places_translation_in_last_column() {
        let m = bake(&Point3::new(1.0, 2.0, 3.0), &UnitQuaternion::identity());
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(1, 3)], 2.0);
        assert_eq!(m[(2, 3)], 3.0);
    }
}
