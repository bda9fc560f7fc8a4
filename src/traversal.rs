//! Stack-based front-to-back ray traversal, shared by the k-d tree and the
//! BVH through the [`crate::node::PackedNode`] trait.
//!
//! Both node kinds store a split axis (tagged into the low bits of the child
//! index) and a split-plane coordinate, so a single loop can walk either:
//! clip the ray against the root bounds, then repeatedly decide, from the
//! sign of `split - origin[axis]`, which child the ray enters first, descend
//! there, and push the other child on an explicit stack together with the
//! `[tmin, tmax]` interval it is valid for. A hit found in a leaf is
//! returned immediately once `t` falls inside that leaf's interval, since
//! front-to-back order guarantees nothing still on the stack can be closer.

use crate::aabb::Aabb;
use crate::node::PackedNode;
use crate::ray::Ray;
use crate::scratch::MAX_BSP_SIZE;
use crate::triangle::IsectTriangle;
use crate::vector::component;

const INVALID_INDEX: u32 = u32::MAX;

/// Closest-hit result: a hit triangle's barycentric weights plus `t`.
///
/// Mirrors the teacher's `geom::Hit`: an invalid hit carries `NaN` in every
/// numeric field and `INVALID_INDEX` as the triangle id, and the two states
/// are kept consistent by a debug-only invariant check rather than an enum,
/// so the struct can be written to/read from a flat buffer unchanged.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    pub tri_index: u32,
    pub t: f32,
    pub alpha: f32,
    pub beta: f32,
}

impl Hit {
    pub fn none() -> Self {
        Hit {
            tri_index: INVALID_INDEX,
            t: f32::NAN,
            alpha: f32::NAN,
            beta: f32::NAN,
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.tri_index == INVALID_INDEX {
            debug_assert!(self.t.is_nan());
            false
        } else {
            debug_assert!(!self.t.is_nan());
            true
        }
    }
}

/// Intersects `ray` against a tree of packed `N` nodes holding triangle
/// indices, returning the closest hit within `(0.001, t_max]`.
///
/// `bounds` must be the root AABB the tree was built over; `nodes[0]` is the
/// root. `cull_back_faces` is forwarded to [`IsectTriangle::intersect`].
pub fn intersect<N: PackedNode>(
    nodes: &[N],
    indices: &[u32],
    bounds: Aabb,
    triangles: &[IsectTriangle],
    ray: &Ray,
    t_max: f32,
    cull_back_faces: bool,
) -> Option<Hit> {
    let (mut tmin, mut tmax) = bounds.clip_ray(ray, t_max)?;
    let mut stack: Vec<(u32, f32, f32)> = Vec::with_capacity(MAX_BSP_SIZE);
    let mut node_idx = 0u32;

    loop {
        let node = nodes[node_idx as usize];
        if node.is_leaf() {
            let offset = node.leaf_index_offset();
            let count = node.leaf_count();
            let mut best: Option<Hit> = None;
            let mut best_t = tmax;
            for i in 0..count {
                let prim = indices[(offset + i) as usize];
                if let Some((t, alpha, beta)) =
                    triangles[prim as usize].intersect(ray, best_t, cull_back_faces)
                {
                    best_t = t;
                    best = Some(Hit {
                        tri_index: prim,
                        t,
                        alpha,
                        beta,
                    });
                }
            }
            if let Some(hit) = best {
                if hit.t <= tmax {
                    return Some(hit);
                }
            }
            match stack.pop() {
                Some((idx, tn, tx)) => {
                    node_idx = idx;
                    tmin = tn;
                    tmax = tx;
                }
                None => return None,
            }
        } else {
            let axis = node.axis();
            let split = node.split_coord();
            let origin = component(ray.origin, axis);
            let inv_dir = component(ray.inv_dir, axis);
            let t = (split - origin) * inv_dir;

            let left = node.left_child_index();
            let right = left + 1;
            let (near, far) = if origin <= split { (left, right) } else { (right, left) };

            if t > tmax || t < 0.0 {
                node_idx = near;
            } else if t < tmin {
                node_idx = far;
            } else {
                stack.push((far, t, tmax));
                node_idx = near;
                tmax = t;
            }
        }
    }
}

/// Intersects every ray in `rays` against the same tree in parallel.
///
/// Traversal is read-only after build (§5 of the design): the node and index
/// arrays are never mutated once [`crate::kdtree::build`]/[`crate::bvh::build`]
/// return, and each ray gets its own traversal stack and `Hit`, so there is no
/// shared mutable state to synchronize. This is the batch entry point a
/// renderer driving many primary/shadow rays per frame would call instead of
/// looping [`intersect`] itself.
pub fn intersect_many<N: PackedNode + Sync>(
    nodes: &[N],
    indices: &[u32],
    bounds: Aabb,
    triangles: &[IsectTriangle],
    rays: &[Ray],
    t_max: f32,
    cull_back_faces: bool,
) -> Vec<Option<Hit>> {
    use rayon::prelude::*;
    rays.par_iter()
        .map(|ray| intersect(nodes, indices, bounds, triangles, ray, t_max, cull_back_faces))
        .collect()
}

/// Shadow-ray query: true iff nothing in the tree occludes the segment
/// `a..b`. Traversal stops at the first hit closer than the endpoint,
/// exactly as [`intersect`] but without assembling a `Hit`.
pub fn is_visible<N: PackedNode>(
    nodes: &[N],
    indices: &[u32],
    bounds: Aabb,
    triangles: &[IsectTriangle],
    a: crate::vector::Vec3,
    b: crate::vector::Vec3,
) -> bool {
    let dir = b - a;
    let ray = Ray::new(a, dir);
    // t=1 reaches `b` exactly; pull in slightly so a triangle through the
    // endpoint itself doesn't register as an occluder.
    const ENDPOINT_EPS: f32 = 1e-3;
    let target_t = 1.0 - ENDPOINT_EPS;

    intersect(nodes, indices, bounds, triangles, &ray, target_t, false).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdtree::{self, KdBuilderConfig, SubdivisionMode};
    use crate::triangle::Triangle;
    use crate::vector::Vec3;

    fn scene() -> (Vec<Triangle>, Vec<IsectTriangle>, Aabb) {
        let tris = vec![
            Triangle {
                p0: Vec3::new(0.0, 0.0, 0.0),
                p1: Vec3::new(1.0, 0.0, 0.0),
                p2: Vec3::new(0.0, 1.0, 0.0),
            },
            Triangle {
                p0: Vec3::new(2.0, 0.0, 0.0),
                p1: Vec3::new(3.0, 0.0, 0.0),
                p2: Vec3::new(2.0, 1.0, 0.0),
            },
        ];
        let isect: Vec<IsectTriangle> = tris.iter().map(IsectTriangle::precompute).collect();
        let bounds = Aabb::from_points(&[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 1.0),
        ]);
        (tris, isect, bounds)
    }

    #[test]
    fn ray_hits_nearer_triangle() {
        let (tris, isect, bounds) = scene();
        let config = KdBuilderConfig {
            mode: SubdivisionMode::Simple,
            max_depth: 4,
            max_list_length: 1,
        };
        let tree = kdtree::build(&tris, bounds, config).unwrap();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect(&tree.nodes, &tree.indices, tree.bounds, &isect, &ray, f32::INFINITY, false)
            .expect("should hit triangle A");
        assert_eq!(hit.tri_index, 0);
        assert!((hit.t - 1.0).abs() < 1e-4);
        assert!((hit.alpha - 0.25).abs() < 1e-4);
        assert!((hit.beta - 0.25).abs() < 1e-4);
    }

    #[test]
    fn intersect_many_matches_sequential_intersect() {
        let (tris, isect, bounds) = scene();
        let tree = kdtree::build(&tris, bounds, KdBuilderConfig::default()).unwrap();
        let rays = vec![
            Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0)),
            Ray::new(Vec3::new(2.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0)),
            Ray::new(Vec3::new(1.5, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0)),
        ];
        let batch = intersect_many(&tree.nodes, &tree.indices, tree.bounds, &isect, &rays, f32::INFINITY, false);
        for (ray, expected) in rays.iter().zip(batch.iter()) {
            let sequential = intersect(&tree.nodes, &tree.indices, tree.bounds, &isect, ray, f32::INFINITY, false);
            match (expected, sequential) {
                (Some(a), Some(b)) => {
                    assert_eq!(a.tri_index, b.tri_index);
                    assert!((a.t - b.t).abs() < 1e-4);
                }
                (None, None) => {}
                _ => panic!("intersect_many disagreed with intersect"),
            }
        }
    }

    #[test]
    fn miss_when_ray_passes_between_triangles() {
        let (tris, isect, bounds) = scene();
        let tree = kdtree::build(&tris, bounds, KdBuilderConfig::default()).unwrap();
        let ray = Ray::new(Vec3::new(1.5, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect(&tree.nodes, &tree.indices, tree.bounds, &isect, &ray, f32::INFINITY, false).is_none());
    }

    #[test]
    fn visibility_occluded_by_parallel_triangle() {
        let tris = vec![
            Triangle {
                p0: Vec3::new(-1.0, -1.0, 0.0),
                p1: Vec3::new(2.0, -1.0, 0.0),
                p2: Vec3::new(-1.0, 2.0, 0.0),
            },
            Triangle {
                p0: Vec3::new(-1.0, -1.0, 1.0),
                p1: Vec3::new(2.0, -1.0, 1.0),
                p2: Vec3::new(-1.0, 2.0, 1.0),
            },
        ];
        let isect: Vec<IsectTriangle> = tris.iter().map(IsectTriangle::precompute).collect();
        let bounds = Aabb::from_points(&[Vec3::new(-1.0, -1.0, 0.0), Vec3::new(2.0, 2.0, 1.0)]);
        let tree = kdtree::build(&tris, bounds, KdBuilderConfig::default()).unwrap();

        let visible = is_visible(
            &tree.nodes,
            &tree.indices,
            tree.bounds,
            &isect,
            Vec3::new(0.5, 0.5, -1.0),
            Vec3::new(0.5, 0.5, 2.0),
        );
        assert!(!visible);
    }

    #[test]
    fn every_ray_misses_an_empty_scene() {
        let bounds = Aabb::from_points(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)]);
        let tree = kdtree::build(&[], bounds, KdBuilderConfig::default()).unwrap();
        let isect: Vec<IsectTriangle> = Vec::new();
        let ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(intersect(&tree.nodes, &tree.indices, tree.bounds, &isect, &ray, f32::INFINITY, false).is_none());
    }
}
