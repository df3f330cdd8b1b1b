//! Spatial index for mouse-driven ray picking against triangle scenes.
//!
//! This crate provides the data structures for answering "which triangle, if
//! any, does this ray first hit" queries efficiently:
//!
//! - [`Aabb3`] - axis-aligned bounding box with slab-method ray tests
//! - [`Ray`] - origin + normalized direction value type
//! - [`Triangle`] - immutable transformed triangle with ray intersection
//! - [`KdTree`] - kd-tree over triangle bounding boxes with nearest-hit queries
//!
//! # Example
//!
//! ```
//! use raypick_spatial::{KdTree, Triangle};
//! use glam::{Mat4, Vec3};
//!
//! let triangles = vec![
//!     Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0))),
//!     Triangle::new(Mat4::from_translation(Vec3::new(3.0, 0.0, 5.0))),
//! ];
//! let tree = KdTree::build(triangles, -10.0, 10.0);
//!
//! // Cast a ray down the +Z axis and read the nearest hit
//! let hit = tree.search_hit(Vec3::ZERO, Vec3::Z, 100.0).unwrap();
//! assert_eq!(hit.index, 0);
//! assert!((hit.t - 5.0).abs() < 1e-4);
//! ```

use glam::{Mat4, Vec3};

mod kdtree;
mod triangle;

pub use kdtree::*;
pub use triangle::*;

// ============================================================================
// Ray
// ============================================================================

/// A ray in 3D space.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ray {
    /// Origin of the ray.
    pub origin: Vec3,
    /// Direction of the ray (normalized).
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Creates a new ray, returning `None` for a zero-length direction.
    pub fn try_new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    /// Returns the point at parameter t along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ============================================================================
// AABB
// ============================================================================

/// 3D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// A unit cube spanning `[0, 1]` on every axis, expressed as a single
    /// 16-vertex line strip covering all 12 edges. Scale and translate it with
    /// [`Aabb3::wire_transform`] to draw any box as a wireframe.
    pub const WIRE_STRIP: [Vec3; 16] = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];

    /// Creates a new AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a cube spanning `[min_val, max_val]` on every axis.
    pub fn cube(min_val: f32, max_val: f32) -> Self {
        Self::new(Vec3::splat(min_val), Vec3::splat(max_val))
    }

    /// Returns the minimal AABB enclosing a triangle's world-space vertices.
    pub fn from_triangle(triangle: &Triangle) -> Self {
        let [v0, v1, v2] = triangle.world_vertices();
        Self::new(v0.min(v1).min(v2), v0.max(v1).max(v2))
    }

    /// Returns the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the half-extents (half-size) of the AABB.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Checks if this AABB contains a point (inclusive bounds).
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Checks if this AABB fully contains another AABB.
    pub fn contains(&self, other: &Aabb3) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Checks if this AABB intersects another AABB.
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the union of two AABBs.
    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        Aabb3::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Splits the AABB at a plane perpendicular to `axis` (0 = x, 1 = y,
    /// 2 = z) passing through coordinate `at`, returning the (low, high)
    /// halves. Their union is exactly this AABB.
    pub fn split(&self, axis: usize, at: f32) -> (Aabb3, Aabb3) {
        let mut low_max = self.max;
        low_max[axis] = at;
        let mut high_min = self.min;
        high_min[axis] = at;
        (
            Aabb3::new(self.min, low_max),
            Aabb3::new(high_min, self.max),
        )
    }

    /// Tests intersection with a ray using the slab method.
    ///
    /// Returns the entry distance along the ray (0 when the origin is inside
    /// the box), or `None` when the ray misses the box, the box lies behind
    /// the origin, or the entry distance exceeds `max_distance`. Bounds are
    /// inclusive: a ray exactly on a face counts as a hit. A zero direction
    /// component is treated as parallel to that slab and never divided by.
    pub fn intersect_ray(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir == 0.0 {
                // Parallel to this slab: the origin must lie within it.
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
            } else {
                let inv = 1.0 / dir;
                let mut t0 = (self.min[axis] - origin) * inv;
                let mut t1 = (self.max[axis] - origin) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_near = t_near.max(t0);
                t_far = t_far.min(t1);
                if t_near > t_far {
                    return None;
                }
            }
        }

        if t_far < 0.0 {
            return None;
        }
        let entry = t_near.max(0.0);
        if entry > max_distance {
            return None;
        }
        Some(entry)
    }

    /// Returns the transform that maps [`Aabb3::WIRE_STRIP`] onto this box,
    /// for wireframe visualization.
    pub fn wire_transform(&self) -> Mat4 {
        Mat4::from_translation(self.min) * Mat4::from_scale(self.size())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdtree::KdNode;

    // ========================================================================
    // AABB basics
    // ========================================================================

    #[test]
    fn test_aabb_union_contains_both() {
        let a = Aabb3::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb3::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b);

        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_aabb_from_triangle_contains_vertices() {
        let triangle = Triangle::new(
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_rotation_y(0.7),
        );
        let bounds = Aabb3::from_triangle(&triangle);

        for v in triangle.world_vertices() {
            assert!(bounds.contains_point(v));
        }
    }

    #[test]
    fn test_aabb_split_halves_union_to_parent() {
        let b = Aabb3::cube(-4.0, 4.0);
        let (low, high) = b.split(1, 1.0);

        assert_eq!(low.max.y, 1.0);
        assert_eq!(high.min.y, 1.0);
        assert_eq!(low.union(&high), b);
    }

    // ========================================================================
    // Slab-method ray tests
    // ========================================================================

    #[test]
    fn test_ray_hits_box_front_face() {
        let b = Aabb3::cube(-1.0, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let entry = b.intersect_ray(&ray, 100.0).unwrap();
        assert!((entry - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_ray_on_face_is_inclusive_hit() {
        let b = Aabb3::cube(-1.0, 1.0);
        // Travels exactly along the x = 1 face.
        let ray = Ray::new(Vec3::new(1.0, 0.0, -5.0), Vec3::Z);

        assert!(b.intersect_ray(&ray, 100.0).is_some());
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let b = Aabb3::cube(-1.0, 1.0);
        let ray = Ray::new(Vec3::new(2.0, 0.0, -5.0), Vec3::Z);

        assert!(b.intersect_ray(&ray, 100.0).is_none());
    }

    #[test]
    fn test_origin_inside_box_enters_at_zero() {
        let b = Aabb3::cube(-1.0, 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, -0.8, 0.52));

        assert_eq!(b.intersect_ray(&ray, 100.0), Some(0.0));
    }

    #[test]
    fn test_box_behind_origin_misses() {
        let b = Aabb3::cube(-1.0, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);

        assert!(b.intersect_ray(&ray, 100.0).is_none());
    }

    #[test]
    fn test_entry_beyond_max_distance_misses() {
        let b = Aabb3::cube(-1.0, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        assert!(b.intersect_ray(&ray, 3.0).is_none());
        assert!(b.intersect_ray(&ray, 4.0).is_some());
    }

    #[test]
    fn test_wire_transform_maps_unit_corners() {
        let b = Aabb3::new(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(4.0, 3.0, 5.0));
        let m = b.wire_transform();

        let min = m.transform_point3(Vec3::ZERO);
        let max = m.transform_point3(Vec3::ONE);
        assert!((min - b.min).length() < 1e-5);
        assert!((max - b.max).length() < 1e-5);
    }

    // ========================================================================
    // Triangle intersection
    // ========================================================================

    #[test]
    fn test_triangle_direct_hit() {
        let triangle = Triangle::new(Mat4::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let (t, point) = triangle.intersect_ray(&ray, 100.0).unwrap();
        assert!((t - 5.0).abs() < 1e-4);
        assert!(point.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn test_triangle_behind_origin_misses() {
        let triangle = Triangle::new(Mat4::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);

        assert!(triangle.intersect_ray(&ray, 100.0).is_none());
    }

    #[test]
    fn test_triangle_parallel_ray_misses() {
        let triangle = Triangle::new(Mat4::IDENTITY);
        // In the triangle's plane.
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);

        assert!(triangle.intersect_ray(&ray, 100.0).is_none());
    }

    #[test]
    fn test_triangle_outside_barycentric_misses() {
        let triangle = Triangle::new(Mat4::IDENTITY);
        // Passes the plane well outside the triangle.
        let ray = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::Z);

        assert!(triangle.intersect_ray(&ray, 100.0).is_none());
    }

    #[test]
    fn test_triangle_max_distance_is_inclusive() {
        let triangle = Triangle::new(Mat4::IDENTITY);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        assert!(triangle.intersect_ray(&ray, 5.0).is_some());
        assert!(triangle.intersect_ray(&ray, 4.0).is_none());
    }

    #[test]
    fn test_model_matrix_offsets_along_local_normal() {
        let triangle = Triangle::new(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let decal = triangle.model_matrix(0.25);

        let base = triangle.transform().transform_point3(Vec3::ZERO);
        let offset = decal.transform_point3(Vec3::ZERO);
        assert!((offset - base - Vec3::new(0.0, 0.0, 0.25)).length() < 1e-5);
    }

    // ========================================================================
    // KdTree construction invariants
    // ========================================================================

    fn check_node(node: &KdNode, parent: Option<&Aabb3>) {
        if let Some(parent) = parent {
            // Allow for the epsilon the split math can introduce.
            let slack = Aabb3::new(
                parent.min - Vec3::splat(1e-4),
                parent.max + Vec3::splat(1e-4),
            );
            assert!(
                slack.contains(node.bounds()),
                "child box must stay within its parent"
            );
        }
        if let KdNode::Internal { left, right, .. } = node {
            check_node(left, Some(node.bounds()));
            check_node(right, Some(node.bounds()));
        }
    }

    #[test]
    fn test_bounding_invariant_holds() {
        let triangles = random_scene(80, 10.0);
        let tree = KdTree::build(triangles, -10.0, 10.0);

        check_node(tree.root(), None);

        let root = tree.root().bounds();
        for triangle in tree.triangles() {
            assert!(
                root.contains(&Aabb3::from_triangle(triangle)),
                "root box must contain every triangle's bounding box"
            );
        }
    }

    #[test]
    fn test_boxes_list_covers_every_node() {
        let triangles = random_scene(30, 10.0);
        let tree = KdTree::build(triangles, -10.0, 10.0);

        fn count(node: &KdNode) -> usize {
            match node {
                KdNode::Leaf { .. } => 1,
                KdNode::Internal { left, right, .. } => 1 + count(left) + count(right),
            }
        }
        assert_eq!(tree.boxes().len(), count(tree.root()));
        assert_eq!(tree.boxes()[0], *tree.root().bounds());
    }

    #[test]
    fn test_no_triangle_is_dropped() {
        let triangles = random_scene(60, 10.0);
        let count = triangles.len();
        let tree = KdTree::build(triangles, -10.0, 10.0);

        let mut seen = vec![false; count];
        fn visit(node: &KdNode, seen: &mut [bool]) {
            match node {
                KdNode::Leaf { triangles, .. } => {
                    for &i in triangles {
                        seen[i as usize] = true;
                    }
                }
                KdNode::Internal { left, right, .. } => {
                    visit(left, seen);
                    visit(right, seen);
                }
            }
        }
        visit(tree.root(), &mut seen);
        assert!(seen.iter().all(|&s| s), "every triangle reachable from a leaf");
    }

    // ========================================================================
    // KdTree queries
    // ========================================================================

    /// A ray through each triangle's centroid along its normal, fired from
    /// outside the bounding box, must hit that triangle. Triangles sit on a
    /// sparse grid so none occludes another.
    #[test]
    fn test_coverage_centroid_rays() {
        let mut triangles = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let translation = Vec3::new(i as f32 * 4.0 - 10.0, j as f32 * 4.0 - 10.0, 0.0);
                triangles.push(Triangle::new(Mat4::from_translation(translation)));
            }
        }
        let tree = KdTree::build(triangles, -12.0, 12.0);

        for (index, triangle) in tree.triangles().iter().enumerate() {
            let normal = triangle.normal();
            let origin = triangle.centroid() + normal * 5.0;
            let hit = tree
                .search_hit(origin, -normal, 100.0)
                .expect("centroid ray must hit");
            assert_eq!(hit.index, index);
            assert!((hit.t - 5.0).abs() < 1e-3);
        }
    }

    /// Tree queries must agree with a linear scan over all triangles, both on
    /// which rays hit at all and on the hit distance.
    #[test]
    fn test_equivalence_with_brute_force() {
        let triangles = random_scene(60, 10.0);
        let tree = KdTree::build(triangles, -10.0, 10.0);

        let mut hits = 0;
        for _ in 0..300 {
            let origin = Vec3::new(
                rand_f32(-20.0, 20.0),
                rand_f32(-20.0, 20.0),
                rand_f32(-20.0, 20.0),
            );
            // Aim at a random point inside the world cube so a fair share of
            // rays actually cross the scene.
            let target = Vec3::new(
                rand_f32(-10.0, 10.0),
                rand_f32(-10.0, 10.0),
                rand_f32(-10.0, 10.0),
            );
            let direction = target - origin;
            if direction.length() < 1e-3 {
                continue;
            }

            let tree_hit = tree.search_hit(origin, direction, 100.0);
            let brute_hit = brute_force_hit(tree.triangles(), origin, direction, 100.0);

            match (tree_hit, brute_hit) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    hits += 1;
                    assert!(
                        (a.t - b.t).abs() < 1e-4,
                        "tree t {} vs brute-force t {}",
                        a.t,
                        b.t
                    );
                    assert!(a.point.abs_diff_eq(b.point, 1e-3));
                }
                (a, b) => panic!("tree {:?} disagrees with brute force {:?}", a, b),
            }
        }
        assert!(hits > 0, "sample rays must produce some hits");
    }

    #[test]
    fn test_idempotent_queries() {
        let triangles = random_scene(40, 10.0);
        let tree = KdTree::build(triangles, -10.0, 10.0);

        let origin = Vec3::new(0.0, 0.0, -30.0);
        let direction = Vec3::new(0.1, 0.05, 1.0);
        let first = tree.search_hit(origin, direction, 100.0);
        let second = tree.search_hit(origin, direction, 100.0);
        assert_eq!(first, second);
    }

    /// Three stacked triangles at z = 0, 5 and 10; a ray from z = -5 must
    /// report the nearest one at t = 5, and a shorter ray must miss.
    #[test]
    fn test_stacked_triangles_nearest_wins() {
        let scale = Mat4::from_scale(Vec3::new(2.0, 2.0, 1.0));
        let triangles = vec![
            Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 0.0)) * scale),
            Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)) * scale),
            Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)) * scale),
        ];
        let tree = KdTree::build(triangles, -10.0, 10.0);

        let hit = tree
            .search_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 100.0)
            .unwrap();
        assert_eq!(hit.index, 0);
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert!(hit.point.abs_diff_eq(Vec3::ZERO, 1e-3));

        assert!(tree
            .search_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 4.0)
            .is_none());
        // The bound is inclusive.
        assert!(tree
            .search_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 5.0)
            .is_some());
    }

    #[test]
    fn test_degenerate_direction_is_rejected() {
        let triangles = random_scene(10, 10.0);
        let tree = KdTree::build(triangles, -10.0, 10.0);

        assert!(tree.search_hit(Vec3::ZERO, Vec3::ZERO, 100.0).is_none());
    }

    #[test]
    fn test_empty_tree_never_hits() {
        let tree = KdTree::build(Vec::new(), -10.0, 10.0);

        assert!(tree.is_empty());
        assert_eq!(tree.boxes().len(), 1);
        assert!(tree.search_hit(Vec3::ZERO, Vec3::Z, 100.0).is_none());
    }

    /// Below the leaf threshold the tree degenerates to a single leaf and
    /// queries fall back to a plain scan.
    #[test]
    fn test_single_leaf_tree_still_answers() {
        let triangles = vec![Triangle::new(Mat4::from_translation(Vec3::new(
            0.0, 0.0, 3.0,
        )))];
        let tree = KdTree::build(triangles, -10.0, 10.0);

        assert_eq!(tree.boxes().len(), 1);
        let hit = tree.search_hit(Vec3::ZERO, Vec3::Z, 100.0).unwrap();
        assert_eq!(hit.index, 0);
        assert!((hit.t - 3.0).abs() < 1e-4);
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn brute_force_hit(
        triangles: &[Triangle],
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<RayHit> {
        let ray = Ray::try_new(origin, direction)?;
        let mut best: Option<RayHit> = None;
        for (index, triangle) in triangles.iter().enumerate() {
            if let Some((t, point)) = triangle.intersect_ray(&ray, max_distance) {
                if best.map_or(true, |h| t < h.t) {
                    best = Some(RayHit { index, t, point });
                }
            }
        }
        best
    }

    fn random_scene(count: usize, extremes: f32) -> Vec<Triangle> {
        (0..count)
            .map(|_| {
                let translation = Vec3::new(
                    rand_f32(-extremes, extremes),
                    rand_f32(-extremes, extremes),
                    rand_f32(-extremes, extremes),
                );
                let transform = Mat4::from_translation(translation)
                    * Mat4::from_rotation_x(rand_f32(0.0, std::f32::consts::TAU))
                    * Mat4::from_rotation_y(rand_f32(0.0, std::f32::consts::TAU))
                    * Mat4::from_rotation_z(rand_f32(0.0, std::f32::consts::TAU));
                Triangle::new(transform)
            })
            .collect()
    }

    /// Simple LCG random number generator for tests.
    fn rand_f32(min: f32, max: f32) -> f32 {
        use std::cell::Cell;
        thread_local! {
            static SEED: Cell<u64> = const { Cell::new(987654321) };
        }
        SEED.with(|seed| {
            let s = seed.get().wrapping_mul(6364136223846793005).wrapping_add(1);
            seed.set(s);
            let t = ((s >> 33) as u32) as f32 / u32::MAX as f32;
            min + t * (max - min)
        })
    }
}
