//! Text labels drawn over the AR view.

use crate::scene::{ObjectMetadata, RenderObjectPool};
use crate::transform::{self, PerspectiveCamera};

pub const LABEL_COLOR: Rgb = Rgb(0, 255, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// 2D canvas layered over the scene, sized in pixels.
pub trait LabelSurface: Send {
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgb);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Surface that keeps the labels of the last composed frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    labels: Vec<Label>,
    clears: u64,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn clears(&self) -> u64 {
        self.clears
    }
}

impl LabelSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.labels.clear();
        self.clears += 1;
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, _color: Rgb) {
        self.labels.push(Label {
            text: text.to_string(),
            x,
            y,
        });
    }
}

pub fn label_text(metadata: &ObjectMetadata) -> String {
    format!("{} RANGE: {:.3} KM", metadata.name, metadata.range_km)
}

/// Clear the surface and label every pooled marker the camera can see.
/// Returns the number of labels drawn.
pub fn compose<S: LabelSurface + ?Sized>(
    surface: &mut S,
    camera: &PerspectiveCamera,
    pool: &RenderObjectPool,
) -> usize {
    surface.clear();
    let (width, height) = surface.size();
    let view_projection = camera.view_projection();
    let frustum = transform::Frustum::from_matrix(&view_projection);

    let mut drawn = 0;
    for obj in pool.objects() {
        if !frustum.intersects_sphere(&obj.bounding_sphere(pool.template())) {
            continue;
        }
        let Some(at) =
            transform::project_to_screen(&obj.position, &view_projection, width, height)
        else {
            continue;
        };
        surface.fill_text(&label_text(&obj.metadata), at.x, at.y, LABEL_COLOR);
        drawn += 1;
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::TickPayload;
    use crate::scene::target;
    use crate::scene::HeadlessBackend;

    fn camera() -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(45.0, 4.0 / 3.0, 1e-6, 5000.0);
        cam.position.z = 1e-6;
        cam
    }

    #[test]
    fn label_format() {
        let m = ObjectMetadata {
            name: "ISS (ZARYA)".into(),
            range_km: 512.34567,
        };
        assert_eq!(label_text(&m), "ISS (ZARYA) RANGE: 512.346 KM");
    }

    #[test]
    fn only_targets_in_view_are_labelled() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();
        // Camera looks north along the horizon: one target ahead, one behind.
        let tick = TickPayload::from_states(vec![
            target("AHEAD", 0.0, 5.0, 800.0),
            target("BEHIND", 180.0, 5.0, 800.0),
        ]);
        pool.apply(&tick, &mut backend).unwrap();

        let mut surface = RecordingSurface::new(800, 600);
        assert_eq!(compose(&mut surface, &camera(), &pool), 1);
        let label = &surface.labels()[0];
        assert_eq!(label.text, "AHEAD RANGE: 800.000 KM");
        assert!((label.x - 400.0).abs() < 1.0);
        assert!(label.y < 300.0);
    }

    #[test]
    fn compose_clears_previous_frame() {
        let pool = RenderObjectPool::default();
        let mut surface = RecordingSurface::new(10, 10);
        surface.fill_text("stale", 0.0, 0.0, LABEL_COLOR);
        assert_eq!(compose(&mut surface, &camera(), &pool), 0);
        assert!(surface.labels().is_empty());
        assert_eq!(surface.clears(), 1);
    }
}
