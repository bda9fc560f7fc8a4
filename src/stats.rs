//! Tree build statistics, collected during construction and carried through
//! to the serialized file header so a loader can report tree quality without
//! walking the whole structure.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TreeStats {
    pub num_nodes: u32,
    pub num_leaves: u32,
    pub num_indices: u32,
    /// Triangle/voxel count the tree was built over (`sumTris` in the
    /// original, renamed since it doubles for voxel scenes).
    pub num_primitives: u32,
    pub sum_leaf_depth: u64,
    pub max_leaf_depth: u32,
    pub max_leaf_count: u32,
    /// Largest scratch-list length seen during the build, i.e. the widest
    /// partition any recursive call had to hold in memory at once.
    pub max_list_length: u32,
    #[serde(skip)]
    pub build_time: Option<Duration>,
}

impl TreeStats {
    pub fn record_leaf(&mut self, depth: u32, count: u32) {
        self.num_leaves += 1;
        self.sum_leaf_depth += depth as u64;
        self.max_leaf_depth = self.max_leaf_depth.max(depth);
        self.max_leaf_count = self.max_leaf_count.max(count);
    }

    pub fn record_list_length(&mut self, len: u32) {
        self.max_list_length = self.max_list_length.max(len);
    }

    pub fn mean_leaf_depth(&self) -> f64 {
        if self.num_leaves == 0 {
            0.0
        } else {
            self.sum_leaf_depth as f64 / self.num_leaves as f64
        }
    }

    /// Merge a spliced-in voxel subtree's stats into the running top-level
    /// aggregate, following `VoxelBVH::writeVoxelBVH`'s bookkeeping.
    pub fn merge_subtree(&mut self, other: &TreeStats) {
        self.num_nodes += other.num_nodes;
        self.num_indices += other.num_indices;
        self.num_primitives += other.num_primitives;
        self.num_leaves += other.num_leaves;
        self.sum_leaf_depth += other.sum_leaf_depth;
        self.max_leaf_depth = self.max_leaf_depth.max(other.max_leaf_depth);
        self.max_list_length = self.max_list_length.max(other.max_list_length);
        self.max_leaf_count = self.max_leaf_count.max(other.max_leaf_count);
        match (self.build_time, other.build_time) {
            (Some(a), Some(b)) => self.build_time = Some(a + b),
            (None, Some(b)) => self.build_time = Some(b),
            _ => {}
        }
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} leaves ({} indices), mean leaf depth {:.2}, max leaf depth {}, max leaf size {}",
            self.num_nodes,
            self.num_leaves,
            self.num_indices,
            self.mean_leaf_depth(),
            self.max_leaf_depth,
            self.max_leaf_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_leaf_depth_is_zero_with_no_leaves() {
        let s = TreeStats::default();
        assert_eq!(s.mean_leaf_depth(), 0.0);
    }

    #[test]
    fn record_leaf_tracks_extremes() {
        let mut s = TreeStats::default();
        s.record_leaf(3, 5);
        s.record_leaf(7, 2);
        assert_eq!(s.max_leaf_depth, 7);
        assert_eq!(s.max_leaf_count, 5);
        assert_eq!(s.num_leaves, 2);
        assert!((s.mean_leaf_depth() - 5.0).abs() < 1e-9);
    }
}
