//! Kd-tree over triangle bounding boxes with nearest-hit ray queries.

use glam::Vec3;

use crate::{Aabb3, Ray, Triangle};

/// Nodes stop splitting at or below this many triangles.
const LEAF_SIZE: usize = 4;

/// Hard bound on tree depth; straddling triangles are referenced from both
/// sides of a split, so depth alone caps the duplication.
const MAX_DEPTH: usize = 20;

/// A resolved nearest-hit query result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RayHit {
    /// Index of the hit triangle in [`KdTree::triangles`].
    pub index: usize,
    /// Distance along the ray to the intersection.
    pub t: f32,
    /// World-space intersection point.
    pub point: Vec3,
}

/// A node of the kd-tree. Internal nodes own both children; leaves hold the
/// indices of every triangle whose bounding box overlaps the node's box.
#[derive(Debug)]
pub(crate) enum KdNode {
    /// Leaf node (possibly empty).
    Leaf {
        bounds: Aabb3,
        triangles: Vec<u32>,
    },
    /// Internal node split at `split` along `axis` (0 = x, 1 = y, 2 = z).
    Internal {
        bounds: Aabb3,
        axis: usize,
        split: f32,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

impl KdNode {
    pub(crate) fn bounds(&self) -> &Aabb3 {
        match self {
            KdNode::Leaf { bounds, .. } => bounds,
            KdNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// A kd-tree over a fixed set of triangles, answering nearest-hit ray queries.
///
/// The tree is built once and is immutable afterwards; queries take `&self`
/// and return their full result, so they can be repeated or issued from
/// multiple threads freely.
///
/// # Example
///
/// ```
/// use raypick_spatial::{KdTree, Triangle};
/// use glam::{Mat4, Vec3};
///
/// let triangles = vec![Triangle::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)))];
/// let tree = KdTree::build(triangles, -10.0, 10.0);
///
/// let hit = tree.search_hit(Vec3::ZERO, Vec3::Z, 100.0).unwrap();
/// assert_eq!(hit.index, 0);
/// assert!((hit.t - 4.0).abs() < 1e-4);
/// assert!(tree.search_hit(Vec3::ZERO, Vec3::Y, 100.0).is_none());
/// ```
#[derive(Debug)]
pub struct KdTree {
    triangles: Vec<Triangle>,
    root: KdNode,
    boxes: Vec<Aabb3>,
}

impl KdTree {
    /// Builds a tree from the scene's triangles and the cubical world bound
    /// `[min_val, max_val]` on every axis.
    ///
    /// The root box is widened to enclose every triangle's bounding box, so
    /// geometry poking past the declared extremes is still found by queries.
    /// Splits cycle through the x, y and z axes by depth at the midpoint of
    /// the node's box; a triangle straddling a split is referenced from both
    /// children, so no triangle is ever dropped.
    pub fn build(triangles: Vec<Triangle>, min_val: f32, max_val: f32) -> Self {
        let tri_bounds: Vec<Aabb3> = triangles.iter().map(Aabb3::from_triangle).collect();
        let mut bounds = Aabb3::cube(min_val, max_val);
        for b in &tri_bounds {
            bounds = bounds.union(b);
        }

        let indices: Vec<u32> = (0..triangles.len() as u32).collect();
        let root = Self::build_node(bounds, indices, &tri_bounds, 0);

        let mut boxes = Vec::new();
        Self::collect_boxes(&root, &mut boxes);

        Self {
            triangles,
            root,
            boxes,
        }
    }

    fn build_node(bounds: Aabb3, indices: Vec<u32>, tri_bounds: &[Aabb3], depth: usize) -> KdNode {
        if indices.len() <= LEAF_SIZE || depth >= MAX_DEPTH {
            return KdNode::Leaf {
                bounds,
                triangles: indices,
            };
        }

        let axis = depth % 3;
        let split = bounds.center()[axis];

        let mut left_indices = Vec::new();
        let mut right_indices = Vec::new();
        for &i in &indices {
            let b = &tri_bounds[i as usize];
            if b.min[axis] <= split {
                left_indices.push(i);
            }
            if b.max[axis] >= split {
                right_indices.push(i);
            }
        }

        // Every triangle straddles the plane: the split separates nothing.
        if left_indices.len() == indices.len() && right_indices.len() == indices.len() {
            return KdNode::Leaf {
                bounds,
                triangles: indices,
            };
        }

        let (left_bounds, right_bounds) = bounds.split(axis, split);
        let left = Box::new(Self::build_node(
            left_bounds,
            left_indices,
            tri_bounds,
            depth + 1,
        ));
        let right = Box::new(Self::build_node(
            right_bounds,
            right_indices,
            tri_bounds,
            depth + 1,
        ));

        KdNode::Internal {
            bounds,
            axis,
            split,
            left,
            right,
        }
    }

    fn collect_boxes(node: &KdNode, out: &mut Vec<Aabb3>) {
        out.push(*node.bounds());
        if let KdNode::Internal { left, right, .. } = node {
            Self::collect_boxes(left, out);
            Self::collect_boxes(right, out);
        }
    }

    /// Returns the triangles the tree was built over, in insertion order.
    /// [`RayHit::index`] indexes into this slice.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns the number of triangles in the tree.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the tree holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns every node's bounding box in pre-order (root first), for
    /// wireframe visualization.
    pub fn boxes(&self) -> &[Aabb3] {
        &self.boxes
    }

    /// Returns the root bounding box.
    pub fn bounds(&self) -> Aabb3 {
        *self.root.bounds()
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &KdNode {
        &self.root
    }

    /// Finds the nearest triangle hit by the ray within `max_distance`
    /// (inclusive).
    ///
    /// Returns `None` for a zero-length direction or when nothing is hit.
    /// Subtrees are visited near-to-far by box entry distance and pruned once
    /// they can no longer beat the best hit found so far.
    pub fn search_hit(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let ray = Ray::try_new(origin, direction)?;
        let mut best = None;
        Self::search_node(&self.root, &self.triangles, &ray, max_distance, &mut best);
        best
    }

    fn search_node(
        node: &KdNode,
        triangles: &[Triangle],
        ray: &Ray,
        max_distance: f32,
        best: &mut Option<RayHit>,
    ) {
        let limit = best.map_or(max_distance, |h| h.t);
        if node.bounds().intersect_ray(ray, limit).is_none() {
            return;
        }

        match node {
            KdNode::Leaf {
                triangles: indices, ..
            } => {
                for &i in indices {
                    let limit = best.map_or(max_distance, |h| h.t);
                    if let Some((t, point)) = triangles[i as usize].intersect_ray(ray, limit) {
                        if best.map_or(true, |h| t < h.t) {
                            *best = Some(RayHit {
                                index: i as usize,
                                t,
                                point,
                            });
                        }
                    }
                }
            }
            KdNode::Internal {
                axis,
                split,
                left,
                right,
                ..
            } => {
                // Descend into the side holding the origin first; the far
                // side is then pruned by its own box test once a closer hit
                // is known.
                let (near, far) = if ray.origin[*axis] <= *split {
                    (left, right)
                } else {
                    (right, left)
                };
                Self::search_node(near, triangles, ray, max_distance, best);
                Self::search_node(far, triangles, ray, max_distance, best);
            }
        }
    }
}
