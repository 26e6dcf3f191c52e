//! Scene-space geometry: where targets sit relative to the observer or the
//! globe, which way their markers face, and what a camera can see.

mod camera;
mod facing;
mod spherical;

pub use camera::{project_to_screen, Frustum, PerspectiveCamera, ScreenPoint, Sphere};
pub use facing::{bake, facing, look_rotation};
pub use spherical::{
    from_spherical, geodetic_to_scene, horizontal_to_scene, velocity_to_scene, EARTH_RADIUS_KM,
};
