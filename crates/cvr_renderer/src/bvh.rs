//! Bounding Volume Hierarchy over mesh triangles.
//!
//! Uses a binary tree built by median split on the longest centroid axis.
//! Leaves store triangle indices into the flattened face array, so the
//! structure stays valid as long as the geometry it was built from does.

use cvr_math::{Aabb, Interval, Ray, Vec3};
use thiserror::Error;

/// Errors raised while building the hierarchy.
#[derive(Error, Debug)]
pub enum BvhError {
    #[error("cannot build a BVH without triangles")]
    NoTriangles,

    #[error("all {0} triangles are degenerate")]
    AllDegenerate(usize),
}

/// Build parameters.
#[derive(Debug, Clone, Copy)]
pub struct BvhBuildOptions {
    /// Maximum triangles per leaf node before splitting.
    pub max_leaf_size: usize,
}

impl Default for BvhBuildOptions {
    fn default() -> Self {
        Self { max_leaf_size: 4 }
    }
}

/// Statistics collected during construction, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct BvhBuildStats {
    pub leaf_nodes: usize,
    pub branch_nodes: usize,
    pub max_depth: usize,
    /// Triangles dropped because they have zero area.
    pub degenerate_triangles: usize,
}

/// The closest intersection found along a ray.
///
/// `u` and `v` are the barycentric weights of the triangle's second and
/// third vertex; the first vertex carries `1 - u - v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub face: u32,
    pub u: f32,
    pub v: f32,
    pub t: f32,
}

/// BVH node - either a branch with two children or a leaf with triangles.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        faces: Vec<u32>,
        bbox: Aabb,
    },
}

impl BvhNode {
    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } => bbox,
            BvhNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// A triangle during construction, with its precomputed bounds.
struct BuildItem {
    face: u32,
    bbox: Aabb,
    centroid: Vec3,
}

/// An acceleration structure over a triangle soup.
///
/// Owns a copy of the flattened geometry so intersection queries cannot
/// drift out of sync with the tree.
pub struct TriangleBvh {
    positions: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    root: BvhNode,
    bounds: Aabb,
    stats: BvhBuildStats,
}

impl TriangleBvh {
    /// Build a BVH over the given triangles.
    ///
    /// Zero-area triangles are skipped; they can never produce an
    /// intersection. Building fails if no usable triangle remains.
    pub fn build(
        positions: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
        options: BvhBuildOptions,
    ) -> Result<Self, BvhError> {
        if faces.is_empty() {
            return Err(BvhError::NoTriangles);
        }

        let mut items = Vec::with_capacity(faces.len());
        for (face_id, face) in faces.iter().enumerate() {
            let v0 = positions[face[0] as usize];
            let v1 = positions[face[1] as usize];
            let v2 = positions[face[2] as usize];

            let area_vector = (v1 - v0).cross(v2 - v0);
            if area_vector.length_squared() <= 0.0 {
                continue;
            }

            let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));
            items.push(BuildItem {
                face: face_id as u32,
                bbox,
                centroid: bbox.centroid(),
            });
        }

        if items.is_empty() {
            return Err(BvhError::AllDegenerate(faces.len()));
        }

        let mut stats = BvhBuildStats {
            degenerate_triangles: faces.len() - items.len(),
            ..Default::default()
        };
        let max_leaf_size = options.max_leaf_size.max(1);
        let root = Self::build_node(items, max_leaf_size, 1, &mut stats);
        let bounds = *root.bbox();

        Ok(Self {
            positions,
            faces,
            root,
            bounds,
            stats,
        })
    }

    /// Recursive construction.
    ///
    /// Simple median-split approach: sort triangles by centroid on the
    /// longest centroid axis, split in half, recurse.
    fn build_node(
        mut items: Vec<BuildItem>,
        max_leaf_size: usize,
        depth: usize,
        stats: &mut BvhBuildStats,
    ) -> BvhNode {
        stats.max_depth = stats.max_depth.max(depth);

        let bounds = items
            .iter()
            .fold(Aabb::EMPTY, |acc, item| Aabb::surrounding(&acc, &item.bbox));

        if items.len() <= max_leaf_size {
            stats.leaf_nodes += 1;
            return BvhNode::Leaf {
                faces: items.into_iter().map(|item| item.face).collect(),
                bbox: bounds,
            };
        }

        // Choose the split axis from the centroid spread
        let centroid_bounds = items.iter().fold(Aabb::EMPTY, |acc, item| {
            Aabb::surrounding(&acc, &Aabb::from_points(item.centroid, item.centroid))
        });
        let axis = centroid_bounds.longest_axis();

        items.sort_unstable_by(|a, b| {
            let a_val = a.centroid[axis];
            let b_val = b.centroid[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_items = items.split_off(items.len() / 2);
        let left = Self::build_node(items, max_leaf_size, depth + 1, stats);
        let right = Self::build_node(right_items, max_leaf_size, depth + 1, stats);

        stats.branch_nodes += 1;
        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Construction statistics.
    pub fn stats(&self) -> BvhBuildStats {
        self.stats
    }

    /// The flattened vertex positions the tree was built from.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// The flattened face array the tree was built from.
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Find the closest triangle intersection within `ray_t`.
    pub fn intersect(&self, origin: Vec3, direction: Vec3, ray_t: Interval) -> Option<RayHit> {
        let ray = Ray::new(origin, direction);
        let mut best: Option<RayHit> = None;
        self.hit_node(&self.root, &ray, ray_t, &mut best);
        best
    }

    fn hit_node(&self, node: &BvhNode, ray: &Ray, mut ray_t: Interval, best: &mut Option<RayHit>) {
        if !node.bbox().hit(ray, ray_t) {
            return;
        }

        match node {
            BvhNode::Leaf { faces, .. } => {
                for &face_id in faces {
                    let face = self.faces[face_id as usize];
                    let hit = intersect_triangle(
                        ray,
                        self.positions[face[0] as usize],
                        self.positions[face[1] as usize],
                        self.positions[face[2] as usize],
                        ray_t,
                    );
                    if let Some((t, u, v)) = hit {
                        ray_t.max = t;
                        *best = Some(RayHit {
                            face: face_id,
                            u,
                            v,
                            t,
                        });
                    }
                }
            }
            BvhNode::Branch { left, right, .. } => {
                self.hit_node(left, ray, ray_t, best);
                // Only check the right subtree up to the closest hit so far
                if let Some(hit) = best {
                    ray_t.max = ray_t.max.min(hit.t);
                }
                self.hit_node(right, ray, ray_t, best);
            }
        }
    }
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Returns (t, u, v) where u weights v1 and v weights v2.
fn intersect_triangle(
    ray: &Ray,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    ray_t: Interval,
) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to the triangle plane
    if a.abs() < 1e-8 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.contains(t) {
        return None;
    }

    Some((t, u, v))
}
