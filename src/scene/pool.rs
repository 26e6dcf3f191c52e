use nalgebra::{Matrix4, Point3};

use super::backend::{MeshHandle, RenderBackend};
use super::error::SceneError;
use super::marker::{Geometry, MarkerTemplate};
use crate::propagation::{TargetRef, TickPayload};
use crate::transform::{self, Sphere};

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub name: String,
    pub range_km: f64,
}

/// One pooled marker. Slots are reused positionally: slot `i` shows the
/// `i`-th visible target of the latest tick, whichever object that is.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderObject {
    pub mesh: MeshHandle,
    pub world: Matrix4<f64>,
    pub position: Point3<f64>,
    pub metadata: ObjectMetadata,
}

impl RenderObject {
    pub fn bounding_sphere(&self, template: &MarkerTemplate) -> Sphere {
        template.bounding.transformed(&self.world)
    }
}

/// Bounded set of marker meshes sized to the visible target count.
#[derive(Debug)]
pub struct RenderObjectPool {
    template: MarkerTemplate,
    geometry: Geometry,
    objects: Vec<RenderObject>,
}

impl Default for RenderObjectPool {
    fn default() -> Self {
        Self::new(MarkerTemplate::triangle())
    }
}

impl RenderObjectPool {
    pub fn new(template: MarkerTemplate) -> Self {
        Self {
            geometry: Geometry::Marker(template.clone()),
            template,
            objects: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[RenderObject] {
        &self.objects
    }

    pub fn template(&self) -> &MarkerTemplate {
        &self.template
    }

    /// Resize the pool to the targets above the horizon and rewrite every slot.
    /// Returns the number of slots in use. If the backend runs out of meshes
    /// the slots that exist still show the first visible targets of this tick
    /// and the allocation error is returned.
    pub fn apply<B: RenderBackend + ?Sized>(
        &mut self,
        payload: &TickPayload,
        backend: &mut B,
    ) -> Result<usize, SceneError> {
        let visible: Vec<TargetRef<'_>> = payload.visible().collect();

        while self.objects.len() > visible.len() {
            if let Some(obj) = self.objects.pop() {
                backend.release_mesh(obj.mesh);
            }
        }
        let mut failure = None;
        while self.objects.len() < visible.len() {
            let mesh = match backend.allocate_mesh(&self.geometry) {
                Ok(mesh) => mesh,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            self.objects.push(RenderObject {
                mesh,
                world: Matrix4::identity(),
                position: Point3::origin(),
                metadata: ObjectMetadata {
                    name: String::new(),
                    range_km: 0.0,
                },
            });
        }

        for (obj, target) in self.objects.iter_mut().zip(&visible) {
            let position = transform::horizontal_to_scene(target.horizontal);
            let rotation = transform::facing(&transform::velocity_to_scene(target.velocity));
            obj.world = transform::bake(&position, &rotation);
            obj.position = position;
            obj.metadata.name.clear();
            obj.metadata.name.push_str(target.name);
            obj.metadata.range_km = target.horizontal.range_km;
            backend.set_transform(obj.mesh, &obj.world);
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(self.objects.len()),
        }
    }

    pub fn clear<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for obj in self.objects.drain(..) {
            backend.release_mesh(obj.mesh);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::propagation::{Geodetic, Horizontal, TargetStateVector, TopocentricVelocity};
    use crate::scene::HeadlessBackend;

    pub(crate) fn target(name: &str, az: f64, el: f64, range: f64) -> TargetStateVector {
        TargetStateVector {
            name: name.to_string(),
            geodetic: Geodetic {
                lat_deg: 0.0,
                lon_deg: 0.0,
                alt_km: 400.0,
            },
            horizontal: Horizontal {
                azimuth_deg: az,
                elevation_deg: el,
                range_km: range,
            },
            velocity: TopocentricVelocity {
                east_km_s: 7.0,
                north_km_s: 0.5,
                up_km_s: 0.0,
            },
        }
    }

    #[test]
    fn pool_tracks_visible_count() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();

        let tick = TickPayload::from_states(vec![
            target("A", 0.0, 10.0, 900.0),
            target("B", 90.0, -3.0, 2500.0),
            target("C", 180.0, 45.0, 600.0),
        ]);
        assert_eq!(pool.apply(&tick, &mut backend).unwrap(), 2);
        assert_eq!(backend.live_meshes(), 2);
        assert_eq!(pool.objects()[0].metadata.name, "A");
        assert_eq!(pool.objects()[1].metadata.name, "C");

        let tick = TickPayload::from_states(vec![target("B", 90.0, 5.0, 2000.0)]);
        assert_eq!(pool.apply(&tick, &mut backend).unwrap(), 1);
        assert_eq!(backend.live_meshes(), 1);
        assert_eq!(pool.objects()[0].metadata.name, "B");
        assert_eq!(pool.objects()[0].metadata.range_km, 2000.0);
    }

    #[test]
    fn shrinking_releases_the_tail_and_keeps_the_head() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();
        let three = TickPayload::from_states(vec![
            target("A", 0.0, 10.0, 900.0),
            target("B", 10.0, 10.0, 900.0),
            target("C", 20.0, 10.0, 900.0),
        ]);
        pool.apply(&three, &mut backend).unwrap();
        let head = pool.objects()[0].mesh;

        let one = TickPayload::from_states(vec![target("Z", 0.0, 10.0, 900.0)]);
        pool.apply(&one, &mut backend).unwrap();
        assert_eq!(pool.objects()[0].mesh, head);
        assert_eq!(pool.objects()[0].metadata.name, "Z");
    }

    #[test]
    fn horizon_target_is_not_visible() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();
        let tick = TickPayload::from_states(vec![target("A", 0.0, 0.0, 900.0)]);
        assert_eq!(pool.apply(&tick, &mut backend).unwrap(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn backend_sees_baked_transform() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();
        let tick = TickPayload::from_states(vec![target("A", 0.0, 10.0, 500.0)]);
        pool.apply(&tick, &mut backend).unwrap();
        let obj = &pool.objects()[0];
        let world = backend.transform(obj.mesh).unwrap();
        assert_eq!(world, &obj.world);
        assert!(obj.position.y > 0.0);
        assert!(obj.position.z < 0.0);
        assert!((world[(1, 3)] - obj.position.y).abs() < 1e-12);
    }

    #[test]
    fn failed_growth_still_rewrites_existing_slots() {
        let mut backend = HeadlessBackend::with_mesh_limit(2);
        let mut pool = RenderObjectPool::default();
        let one = TickPayload::from_states(vec![target("OLD", 0.0, 10.0, 900.0)]);
        pool.apply(&one, &mut backend).unwrap();

        let three = TickPayload::from_states(vec![
            target("A", 0.0, 10.0, 900.0),
            target("B", 10.0, 20.0, 800.0),
            target("C", 20.0, 30.0, 700.0),
        ]);
        assert!(matches!(
            pool.apply(&three, &mut backend),
            Err(SceneError::Allocation(_))
        ));
        assert_eq!(pool.len(), 2);
        let names: Vec<_> = pool.objects().iter().map(|o| o.metadata.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        for obj in pool.objects() {
            assert_ne!(obj.world, Matrix4::identity());
            assert_eq!(backend.transform(obj.mesh), Some(&obj.world));
        }
    }

    #[test]
    fn clear_releases_everything() {
        let mut backend = HeadlessBackend::new();
        let mut pool = RenderObjectPool::default();
        let tick = TickPayload::from_states(vec![
            target("A", 0.0, 10.0, 900.0),
            target("B", 10.0, 10.0, 900.0),
        ]);
        pool.apply(&tick, &mut backend).unwrap();
        pool.clear(&mut backend);
        assert!(pool.is_empty());
        assert_eq!(backend.live_meshes(), 0);
    }
}
