use nalgebra::Point3;

use crate::transform::Sphere;

/// Flat triangle pointing along its local +Y axis, in scene units.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerTemplate {
    pub vertices: [Point3<f64>; 3],
    pub bounding: Sphere,
}

impl Default for MarkerTemplate {
    fn default() -> Self {
        Self::triangle()
    }
}

impl MarkerTemplate {
    pub fn triangle() -> Self {
        Self::from_vertices([
            Point3::new(10.0, -5.0, 0.0),
            Point3::new(0.0, 15.0, 0.0),
            Point3::new(-10.0, -5.0, 0.0),
        ])
    }

    /// The bounding sphere is centred on the axis-aligned box and reaches the
    /// farthest vertex.
    pub fn from_vertices(vertices: [Point3<f64>; 3]) -> Self {
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in &vertices[1..] {
            min = min.inf(v);
            max = max.sup(v);
        }
        let center = nalgebra::center(&min, &max);
        let radius = vertices
            .iter()
            .map(|v| nalgebra::distance(&center, v))
            .fold(0.0, f64::max);
        Self {
            vertices,
            bounding: Sphere { center, radius },
        }
    }
}

/// Geometry a backend can be asked to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Marker(MarkerTemplate),
    Globe { radius: f64 },
}
