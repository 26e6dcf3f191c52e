use nalgebra::{Point3, Vector3};
use std::f64::consts::FRAC_PI_2;

use crate::propagation::{Geodetic, Horizontal, TopocentricVelocity};

/// Mean Earth radius used for the globe scene.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Spherical to Cartesian with polar angle `phi` measured from +Y and
/// azimuthal angle `theta` measured from +Z towards +X.
pub fn from_spherical(radius: f64, phi: f64, theta: f64) -> Point3<f64> {
    let sin_phi_radius = phi.sin() * radius;
    Point3::new(
        sin_phi_radius * theta.sin(),
        phi.cos() * radius,
        sin_phi_radius * theta.cos(),
    )
}

/// Observer-relative scene position of a target. The negative radius puts the
/// target in front of the observer along the sight line, and the mirrored
/// azimuth turns compass bearings into the scene's right-handed frame.
pub fn horizontal_to_scene(h: &Horizontal) -> Point3<f64> {
    from_spherical(
        -h.range_km,
        FRAC_PI_2 + h.elevation_deg.to_radians(),
        -h.azimuth_deg.to_radians(),
    )
}

/// Earth-centred scene position for the globe view.
pub fn geodetic_to_scene(g: &Geodetic) -> Point3<f64> {
    from_spherical(
        EARTH_RADIUS_KM + g.alt_km,
        FRAC_PI_2 - g.lat_deg.to_radians(),
        g.lon_deg.to_radians() + FRAC_PI_2,
    )
}

/// East maps to +X, up to +Y and north to -Z.
pub fn velocity_to_scene(v: &TopocentricVelocity) -> Vector3<f64> {
    Vector3::new(v.east_km_s, v.up_km_s, -v.north_km_s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(azimuth_deg: f64, elevation_deg: f64, range_km: f64) -> Horizontal {
        Horizontal {
            azimuth_deg,
            elevation_deg,
            range_km,
        }
    }

    #[test]
    fn overhead_is_on_the_vertical_axis_for_any_azimuth() {
        for az in [0.0, 45.0, 137.0, 270.0, 359.0] {
            let p = horizontal_to_scene(&horizontal(az, 90.0, 800.0));
            assert!(p.x.abs() < 1e-9, "az {az}: {p}");
            assert!(p.z.abs() < 1e-9, "az {az}: {p}");
            assert!((p.y - 800.0).abs() < 1e-9);
        }
    }

    #[test]
    fn north_low_target_is_ahead_and_above() {
        let p = horizontal_to_scene(&horizontal(0.0, 10.0, 500.0));
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 500.0 * 10f64.to_radians().sin()).abs() < 1e-9);
        assert!((p.z + 500.0 * 10f64.to_radians().cos()).abs() < 1e-9);
    }

    #[test]
    fn east_is_positive_x() {
        let p = horizontal_to_scene(&horizontal(90.0, 0.0, 100.0));
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
        assert!(p.z.abs() < 1e-9);
    }

    #[test]
    fn geodetic_axes() {
        let origin = geodetic_to_scene(&Geodetic {
            lat_deg: 0.0,
            lon_deg: 0.0,
            alt_km: 0.0,
        });
        assert!((origin.x - EARTH_RADIUS_KM).abs() < 1e-9);
        assert!(origin.y.abs() < 1e-9);
        assert!(origin.z.abs() < 1e-6);

        let pole = geodetic_to_scene(&Geodetic {
            lat_deg: 90.0,
            lon_deg: 123.0,
            alt_km: 400.0,
        });
        assert!((pole.y - (EARTH_RADIUS_KM + 400.0)).abs() < 1e-9);
    }

    #[test]
    fn velocity_axes() {
        let v = velocity_to_scene(&TopocentricVelocity {
            east_km_s: 1.0,
            north_km_s: 2.0,
            up_km_s: 3.0,
        });
        assert_eq!(v, Vector3::new(1.0, 3.0, -2.0));
    }
}
