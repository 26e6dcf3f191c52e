use nalgebra::{
    Isometry3, Matrix4, Perspective3, Point3, Translation3, UnitQuaternion, Vector3, Vector4,
};

/// Perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = f64::from(width) / f64::from(height);
        }
    }

    /// Turn the camera so its -Z axis points at `target`.
    pub fn look_at(&mut self, target: &Point3<f64>, up: &Vector3<f64>) {
        self.orientation = super::look_rotation(&(self.position - target), up);
    }

    pub fn projection(&self) -> Matrix4<f64> {
        Perspective3::new(self.aspect, self.fov_y_deg.to_radians(), self.near, self.far)
            .to_homogeneous()
    }

    pub fn view(&self) -> Matrix4<f64> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
            .inverse()
            .to_homogeneous()
    }

    pub fn view_projection(&self) -> Matrix4<f64> {
        self.projection() * self.view()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl Sphere {
    /// Bounding sphere after applying a rigid world transform.
    pub fn transformed(&self, world: &Matrix4<f64>) -> Self {
        Self {
            center: world.transform_point(&self.center),
            radius: self.radius,
        }
    }
}

/// Six clip planes as `(normal, constant)`, normals pointing inwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vector4<f64>; 6],
}

impl Frustum {
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let row = |i: usize| -> Vector4<f64> { m.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(|p| {
            let len = p.xyz().norm();
            if len > 0.0 {
                p / len
            } else {
                p
            }
        });
        Self { planes }
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes.iter().all(|p| {
            p.xyz().dot(&sphere.center.coords) + p.w >= -sphere.radius
        })
    }

    pub fn contains_point(&self, point: &Point3<f64>) -> bool {
        self.intersects_sphere(&Sphere {
            center: *point,
            radius: 0.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Pixel coordinates of `point` with the origin at the top-left corner.
/// Points on the camera plane have no projection.
pub fn project_to_screen(
    point: &Point3<f64>,
    view_projection: &Matrix4<f64>,
    width: u32,
    height: u32,
) -> Option<ScreenPoint> {
    let clip = view_projection * point.to_homogeneous();
    if clip.w == 0.0 {
        return None;
    }
    let half_w = f64::from(width) / 2.0;
    let half_h = f64::from(height) / 2.0;
    Some(ScreenPoint {
        x: clip.x / clip.w * half_w + half_w,
        y: -(clip.y / clip.w) * half_h + half_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(45.0, 1.0, 0.1, 1000.0)
    }

    #[test]
    fn default_camera_sees_negative_z() {
        let f = camera().frustum();
        assert!(f.contains_point(&Point3::new(0.0, 0.0, -10.0)));
        assert!(!f.contains_point(&Point3::new(0.0, 0.0, 10.0)));
        assert!(!f.contains_point(&Point3::new(0.0, 0.0, -2000.0)));
    }

    #[test]
    fn sphere_straddling_a_plane_intersects() {
        let f = camera().frustum();
        // Just outside the right plane at depth 10.
        let edge = 10.0 * (22.5f64).to_radians().tan();
        let sphere = Sphere {
            center: Point3::new(edge + 0.5, 0.0, -10.0),
            radius: 1.0,
        };
        assert!(f.intersects_sphere(&sphere));
        assert!(!f.intersects_sphere(&Sphere { radius: 0.1, ..sphere }));
    }

    #[test]
    fn centre_projects_to_middle_of_screen() {
        let cam = camera();
        let p = project_to_screen(&Point3::new(0.0, 0.0, -5.0), &cam.view_projection(), 800, 600)
            .unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn screen_y_grows_downwards() {
        let cam = camera();
        let vp = cam.view_projection();
        let above = project_to_screen(&Point3::new(0.0, 1.0, -5.0), &vp, 800, 600).unwrap();
        assert!(above.y < 300.0);
    }

    #[test]
    fn look_at_turns_the_view() {
        let mut cam = camera();
        cam.position = Point3::new(36.0, 0.0, 0.0);
        cam.look_at(&Point3::origin(), &Vector3::y());
        let f = cam.frustum();
        assert!(f.contains_point(&Point3::origin()));
        assert!(!f.contains_point(&Point3::new(72.0, 0.0, 0.0)));
    }

    #[test]
    fn rotated_camera_projects_consistently() {
        let mut cam = camera();
        cam.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        // Facing -X now.
        let p = project_to_screen(&Point3::new(-5.0, 0.0, 0.0), &cam.view_projection(), 100, 100)
            .unwrap();
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!(cam.frustum().contains_point(&Point3::new(-5.0, 0.0, 0.0)));
    }
}
