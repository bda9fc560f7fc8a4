//! k-d/BSP tree builder for triangle meshes.
//!
//! Three subdivision policies are offered, all grounded in the original
//! builder's `Subdivide*` family:
//!
//! - [`SubdivisionMode::Simple`]: always split at the midpoint of the
//!   current bounds along the longest axis; give up splitting a child when
//!   doing so would more than double the total triangle count (duplication
//!   from straddling triangles outweighing separation).
//! - [`SubdivisionMode::Normal`]: same spatial midpoint start, but retries
//!   the split up to twice more, nudging the coordinate toward whichever
//!   side currently holds more triangles, and gives up on a branch after
//!   three consecutive splits that fail to shrink it.
//! - [`SubdivisionMode::Balanced`]: chooses both the axis and the split
//!   coordinate from the actual distribution of triangle extents on that
//!   axis (a near-median split), picking whichever of the three axes yields
//!   the fewest triangles on the "min" side. More expensive to build, but
//!   produces noticeably shallower trees on non-uniform scenes.
//!
//! All three share the same straddling-triangle rule: a triangle is placed
//! in the left list if any of its vertices lies at or below the split
//! coordinate, and in the right list if any vertex lies at or above it, so a
//! triangle crossing the plane is duplicated into both children.

use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::error::BspResult;
use crate::node::KdNode;
use crate::scratch::MAX_BSP_SIZE;
use crate::stats::TreeStats;
use crate::triangle::Triangle;
use crate::vector::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdivisionMode {
    Simple,
    Normal,
    Balanced,
}

#[derive(Clone, Copy, Debug)]
pub struct KdBuilderConfig {
    pub mode: SubdivisionMode,
    pub max_depth: u32,
    pub max_list_length: u32,
}

impl Default for KdBuilderConfig {
    fn default() -> Self {
        KdBuilderConfig {
            mode: SubdivisionMode::Normal,
            max_depth: MAX_BSP_SIZE as u32 - 1,
            max_list_length: 2,
        }
    }
}

pub struct KdTree {
    pub nodes: Vec<KdNode>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
    pub stats: TreeStats,
}

// The original builder ping-pongs two preallocated "left" buffers and a ring
// of "right" buffers to avoid per-node heap churn under manual memory
// management. Rust's ownership model makes that aliasing unnecessary here:
// each recursive call below just owns its slice of indices outright, and the
// allocator reuses freed `Vec` backing stores on its own.
struct Builder<'a> {
    triangles: &'a [Triangle],
    config: KdBuilderConfig,
    nodes: Vec<KdNode>,
    indices: Vec<u32>,
    stats: TreeStats,
}

fn straddles_axis(tri: &Triangle, axis: usize, coord: f32) -> (bool, bool) {
    let mut below = false;
    let mut above = false;
    for v in 0..3 {
        let c = tri.vertex_component(v, axis);
        below |= c <= coord;
        above |= c >= coord;
    }
    (below, above)
}

impl<'a> Builder<'a> {
    fn new(triangles: &'a [Triangle], config: KdBuilderConfig) -> Self {
        Builder {
            triangles,
            config,
            nodes: Vec::new(),
            indices: Vec::new(),
            stats: TreeStats::default(),
        }
    }

    fn partition(&self, list: &[u32], axis: usize, coord: f32) -> (Vec<u32>, Vec<u32>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in list {
            let (below, above) = straddles_axis(&self.triangles[i as usize], axis, coord);
            if below {
                left.push(i);
            }
            if above {
                right.push(i);
            }
        }
        (left, right)
    }

    fn make_leaf(&mut self, node_idx: u32, list: &[u32], depth: u32) {
        let offset = self.indices.len() as u32;
        self.indices.extend_from_slice(list);
        self.nodes[node_idx as usize] = KdNode::leaf(offset, list.len() as u32);
        self.stats.record_leaf(depth, list.len() as u32);
    }

    fn reserve_pair(&mut self) -> (u32, u32) {
        let left = self.nodes.len() as u32;
        self.nodes.push(KdNode::leaf(0, 0));
        self.nodes.push(KdNode::leaf(0, 0));
        self.stats.num_nodes += 2;
        (left, left + 1)
    }

    fn build_simple(&mut self, node_idx: u32, list: Vec<u32>, depth: u32, axis: usize, bounds: Aabb) {
        let tri_count = list.len() as u32;
        self.stats.record_list_length(tri_count);
        let split_coord = (crate::vector::component(bounds.min, axis)
            + crate::vector::component(bounds.max, axis))
            / 2.0;

        let (left, right) = self.partition(&list, axis, split_coord);
        let (left_idx, right_idx) = self.reserve_pair();
        self.nodes[node_idx as usize] = KdNode::inner(left_idx, axis, split_coord);

        let new_count = [left.len() as u32, right.len() as u32];
        let total_new = new_count[0] + new_count[1];
        let lists = [left, right];

        for i in 0..2 {
            let child_idx = if i == 0 { left_idx } else { right_idx };
            let child_bounds = if i == 0 {
                bounds.with_max(axis, split_coord)
            } else {
                bounds.with_min(axis, split_coord)
            };
            let should_split = new_count[i] > self.config.max_list_length
                && depth + 1 < self.config.max_depth
                && total_new < 2 * tri_count;
            if should_split {
                let next_axis = child_bounds.longest_axis();
                self.build_simple(child_idx, lists[i].clone(), depth + 1, next_axis, child_bounds);
            } else {
                self.make_leaf(child_idx, &lists[i], depth + 1);
            }
        }
    }

    fn build_normal(
        &mut self,
        node_idx: u32,
        list: Vec<u32>,
        depth: u32,
        axis: usize,
        bounds: Aabb,
        fail_count: u32,
    ) {
        let tri_count = list.len() as u32;
        self.stats.record_list_length(tri_count);
        let lo = crate::vector::component(bounds.min, axis);
        let hi = crate::vector::component(bounds.max, axis);
        let mut split_coord = (lo + hi) / 2.0;

        let mut left = Vec::new();
        let mut right = Vec::new();
        for attempt in 0..3 {
            if attempt > 0 {
                if left.len() > right.len() {
                    split_coord = (lo + split_coord) / 2.0;
                } else {
                    split_coord = (split_coord + hi) / 2.0;
                }
            }
            let (l, r) = self.partition(&list, axis, split_coord);
            left = l;
            right = r;
            let diff = (left.len() as i64 - right.len() as i64).unsigned_abs() as u32;
            if diff < tri_count / 2 {
                break;
            }
        }

        let (left_idx, right_idx) = self.reserve_pair();
        self.nodes[node_idx as usize] = KdNode::inner(left_idx, axis, split_coord);

        let new_count = [left.len() as u32, right.len() as u32];
        let lists = [left, right];
        let bound_coords = [lo, split_coord, hi];

        for i in 0..2 {
            let child_idx = if i == 0 { left_idx } else { right_idx };
            let child_bounds = if i == 0 {
                bounds.with_max(axis, bound_coords[1])
            } else {
                bounds.with_min(axis, bound_coords[1])
            };
            let new_fail_count = if new_count[i] == tri_count { fail_count + 1 } else { 0 };
            let should_split = new_count[i] > self.config.max_list_length
                && depth + 1 < self.config.max_depth
                && new_fail_count < 3;
            if should_split {
                let next_axis = child_bounds.longest_axis();
                self.build_normal(
                    child_idx,
                    lists[i].clone(),
                    depth + 1,
                    next_axis,
                    child_bounds,
                    new_fail_count,
                );
            } else {
                self.make_leaf(child_idx, &lists[i], depth + 1);
            }
        }
    }

    fn triangle_extent(&self, idx: u32, axis: usize) -> (f32, f32) {
        let tri = &self.triangles[idx as usize];
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for v in 0..3 {
            let c = tri.vertex_component(v, axis);
            lo = lo.min(c);
            hi = hi.max(c);
        }
        (lo, hi)
    }

    /// Picks the best of the three axes by looking at how each axis' sorted
    /// extents divide the list, returning `(axis, split_coord, partition)`.
    fn choose_balanced_split(&self, list: &[u32], bounds: Aabb) -> (usize, f32, (Vec<u32>, Vec<u32>)) {
        let mut best: Option<(usize, f32, u32)> = None;
        for axis in 0..3 {
            let mut mins: Vec<f32> = list.iter().map(|&i| self.triangle_extent(i, axis).0).collect();
            let mut maxs: Vec<f32> = list.iter().map(|&i| self.triangle_extent(i, axis).1).collect();
            mins.sort_by(|a, b| a.partial_cmp(b).unwrap());
            maxs.sort_by(|a, b| b.partial_cmp(a).unwrap());

            let lo = crate::vector::component(bounds.min, axis);
            let hi = crate::vector::component(bounds.max, axis);
            let mut split_coord = (lo + hi) / 2.0;
            for i in 1..mins.len() {
                if mins[i] >= maxs[i] {
                    split_coord = (maxs[i].max(mins[i - 1]) + mins[i].min(maxs[i - 1])) / 2.0;
                    break;
                }
            }

            let count_below = list
                .iter()
                .filter(|&&i| self.triangle_extent(i, axis).0 <= split_coord)
                .count() as u32;

            if best.map_or(true, |(_, _, best_count)| count_below < best_count) {
                best = Some((axis, split_coord, count_below));
            }
        }
        let (axis, split_coord, _) = best.expect("at least one axis considered");
        let partition = self.partition(list, axis, split_coord);
        (axis, split_coord, partition)
    }

    fn build_balanced(&mut self, node_idx: u32, list: Vec<u32>, depth: u32, bounds: Aabb) {
        let tri_count = list.len() as u32;
        self.stats.record_list_length(tri_count);
        let (axis, split_coord, (left, right)) = self.choose_balanced_split(&list, bounds);

        let (left_idx, right_idx) = self.reserve_pair();
        self.nodes[node_idx as usize] = KdNode::inner(left_idx, axis, split_coord);

        let new_count = [left.len() as u32, right.len() as u32];
        let lists = [left, right];
        let lo = crate::vector::component(bounds.min, axis);
        let hi = crate::vector::component(bounds.max, axis);

        for i in 0..2 {
            let child_idx = if i == 0 { left_idx } else { right_idx };
            let child_lo = lo + 0.5 * i as f32 * (hi - lo);
            let child_hi = lo + 0.5 * (i as f32 + 1.0) * (hi - lo);
            let child_bounds = bounds.with_min(axis, child_lo).with_max(axis, child_hi);
            let should_split = new_count[i] > self.config.max_list_length
                && depth + 1 < self.config.max_depth
                && new_count[i] != tri_count;
            if should_split {
                self.build_balanced(child_idx, lists[i].clone(), depth + 1, child_bounds);
            } else {
                self.make_leaf(child_idx, &lists[i], depth + 1);
            }
        }
    }
}

/// Builds a k-d/BSP tree over `triangles` using the given configuration.
/// `bounds` must already enclose every triangle.
pub fn build(triangles: &[Triangle], bounds: Aabb, config: KdBuilderConfig) -> BspResult<KdTree> {
    let start = std::time::Instant::now();
    log::info!(
        "building k-d tree ({:?} mode) over {} triangles, bounds {}",
        config.mode,
        triangles.len(),
        bounds
    );

    let mut builder = Builder::new(triangles, config);
    builder.nodes.push(KdNode::leaf(0, 0));
    builder.stats.num_nodes = 1;
    builder.stats.num_primitives = triangles.len() as u32;

    let all: Vec<u32> = (0..triangles.len() as u32).collect();
    let axis = bounds.longest_axis();

    // An empty scene builds a trivial single-leaf tree (count=0) rather than
    // failing: every ray misses it, but there is no ill-defined split to
    // choose an axis/coordinate for, so the subdivision policies are skipped
    // entirely rather than asked to partition nothing.
    if triangles.is_empty() || config.max_depth == 0 {
        builder.make_leaf(0, &all, 0);
    } else {
        match config.mode {
            SubdivisionMode::Simple => builder.build_simple(0, all, 0, axis, bounds),
            SubdivisionMode::Normal => builder.build_normal(0, all, 0, axis, bounds, 0),
            SubdivisionMode::Balanced => builder.build_balanced(0, all, 0, bounds),
        }
    }

    builder.stats.num_indices = builder.indices.len() as u32;
    builder.stats.build_time = Some(start.elapsed());

    log::info!("k-d tree built: {}", builder.stats);

    Ok(KdTree {
        nodes: builder.nodes,
        indices: builder.indices,
        bounds,
        stats: builder.stats,
    })
}
