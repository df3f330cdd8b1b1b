//! Immutable triangle primitive and ray-triangle intersection.

use glam::{Mat4, Vec3};

use crate::Ray;

/// Local-space vertices shared by every triangle. The canonical triangle lies
/// in the z = 0 plane with its geometric normal along +Z.
pub const LOCAL_VERTICES: [Vec3; 3] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.0, 0.5, 0.0),
];

/// Determinants below this magnitude are treated as a ray parallel to the
/// triangle's plane.
const DET_EPSILON: f32 = 1e-8;

/// Hits closer than this along the ray are treated as behind the origin.
const T_EPSILON: f32 = 1e-6;

/// An immutable triangle: the shared canonical vertices placed in the world by
/// a model transform fixed at creation.
///
/// # Example
///
/// ```
/// use raypick_spatial::{Ray, Triangle};
/// use glam::{Mat4, Vec3};
///
/// let triangle = Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)));
/// let ray = Ray::new(Vec3::ZERO, Vec3::Z);
///
/// let (t, point) = triangle.intersect_ray(&ray, 100.0).unwrap();
/// assert!((t - 2.0).abs() < 1e-4);
/// assert!((point.z - 2.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    transform: Mat4,
}

impl Triangle {
    /// Creates a triangle with the given model transform.
    pub fn new(transform: Mat4) -> Self {
        Self { transform }
    }

    /// Returns the model transform.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Returns the three world-space vertices.
    pub fn world_vertices(&self) -> [Vec3; 3] {
        LOCAL_VERTICES.map(|v| self.transform.transform_point3(v))
    }

    /// Returns the world-space centroid.
    pub fn centroid(&self) -> Vec3 {
        let [v0, v1, v2] = self.world_vertices();
        (v0 + v1 + v2) / 3.0
    }

    /// Returns the world-space geometric normal (unit length, zero for a
    /// degenerate transform).
    pub fn normal(&self) -> Vec3 {
        let [v0, v1, v2] = self.world_vertices();
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    /// Returns the model transform translated along the local normal by
    /// `offset`, for rendering a thin decal on the hit surface.
    pub fn model_matrix(&self, offset: f32) -> Mat4 {
        self.transform * Mat4::from_translation(Vec3::new(0.0, 0.0, offset))
    }

    /// Tests the ray against this triangle (Möller–Trumbore).
    ///
    /// Returns the hit distance and the resolved world-space intersection
    /// point. Rays parallel to the triangle's plane, hits behind the origin
    /// and hits past `max_distance` (inclusive bound) all return `None`.
    pub fn intersect_ray(&self, ray: &Ray, max_distance: f32) -> Option<(f32, Vec3)> {
        let [v0, v1, v2] = self.world_vertices();
        let e1 = v1 - v0;
        let e2 = v2 - v0;

        let pvec = ray.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < DET_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - v0;
        let u = tvec.dot(pvec) * inv_det;
        if u < 0.0 || u > 1.0 {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;
        if t < T_EPSILON || t > max_distance {
            return None;
        }
        Some((t, ray.at(t)))
    }
}
