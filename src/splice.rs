//! Voxel-subtree splicing: gluing many independently-built per-voxel BVH
//! subtrees into one flat, self-contained file.
//!
//! Grounded in `VoxelBVH::saveToFile`/`saveNodeInArray`/`writeVoxelBVH`: the
//! top-level BVH is built over voxels (one primitive per voxel), each
//! voxel's own subtree is serialized independently to `<base>_<NNNNN>.ooc`,
//! and splicing walks the top-level tree, replacing every leaf (which holds
//! exactly one voxel index by construction) with the root of that voxel's
//! subtree. Every other node of the subtree is appended to the growing
//! combined node/index arrays, with child and leaf-index payloads shifted so
//! they stay valid at their new position: an inner node's left-child index
//! moves by `node_cursor - 1` (the subtree's own root, at local index 0, is
//! never appended — it overwrites the top-level leaf directly, so every
//! other local index `k` lands at `node_cursor + (k - 1)`), and a leaf's
//! index-array offset moves by `idx_cursor`, the number of primitive
//! indices already written by earlier subtrees.

use std::path::{Path, PathBuf};

use crate::error::{BspError, BspResult};
use crate::node::BvhNode;
use crate::ooc;
use crate::stats::TreeStats;

fn subtree_path(base: &Path, voxel_index: u32) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(format!("_{voxel_index:05}.ooc"));
    PathBuf::from(s)
}

/// Writes one voxel's already-built BVH subtree to `<base>_<NNNNN>.ooc`,
/// where `NNNNN` is `voxel_index` zero-padded to five digits.
pub fn write_voxel_subtree(
    base: &Path,
    voxel_index: u32,
    nodes: &[BvhNode],
    indices: &[u32],
    stats: &TreeStats,
) -> BspResult<()> {
    let path = subtree_path(base, voxel_index);
    ooc::write_tree(&path, nodes, indices, stats)
}

/// Shifts a freshly-loaded subtree's node payloads to their new position,
/// splices the (now-shifted) root into `out_nodes[leaf_slot]`, appends the
/// rest, and returns `(nodes_added, indices_added)` for the caller to
/// advance its cursors by.
fn splice_one(
    out_nodes: &mut Vec<BvhNode>,
    out_indices: &mut Vec<u32>,
    leaf_slot: usize,
    mut sub_nodes: Vec<BvhNode>,
    sub_indices: Vec<u32>,
    node_cursor: u32,
    idx_cursor: u32,
) -> (u32, u32) {
    let node_delta = node_cursor - 1;
    for node in sub_nodes.iter_mut() {
        if node.is_leaf() {
            node.shift_leaf_offset(idx_cursor);
        } else {
            node.shift_child_index(node_delta);
        }
    }

    let nodes_added = (sub_nodes.len() as u32).saturating_sub(1);
    let indices_added = sub_indices.len() as u32;

    let mut rest = sub_nodes.split_off(1);
    out_nodes[leaf_slot] = sub_nodes[0];
    out_nodes.append(&mut rest);
    out_indices.extend(sub_indices);

    (nodes_added, indices_added)
}

/// Splices each top-level leaf's voxel subtree into a combined, flat tree.
///
/// `top_nodes`/`top_indices` is the high-level BVH built over the voxel
/// list (see [`crate::bvh::build`] instantiated over `Voxel`); each leaf is
/// expected to hold exactly one voxel index, following the original's
/// "more than one voxel in this leaf" error path (turned here into a
/// [`BspError::DegenerateGeometry`] rather than logging and continuing,
/// since a multi-voxel leaf means the high-level tree was built with too
/// large a leaf-size cap for voxel splicing to make sense).
///
/// A subtree file that is missing or unreadable is logged and replaced with
/// an empty leaf rather than aborting the whole splice, matching
/// `writeVoxelBVH`'s early-return-with-warning behavior.
pub fn splice_voxel_tree(
    base: &Path,
    top_nodes: &[BvhNode],
    top_indices: &[u32],
    top_stats: &TreeStats,
) -> BspResult<(Vec<BvhNode>, Vec<u32>, TreeStats)> {
    let mut out_nodes: Vec<BvhNode> = top_nodes.to_vec();
    let mut out_indices: Vec<u32> = Vec::new();

    // Reset the fields that get re-accumulated per-subtree below, keeping
    // only the top-level inner-node bookkeeping, mirroring `saveToFile`'s
    // pre-walk reset of `treeStats`.
    let mut stats = *top_stats;
    stats.num_nodes = top_nodes.len() as u32 - top_stats.num_leaves;
    stats.num_indices = 0;
    stats.num_primitives = 0;
    stats.num_leaves = 0;
    stats.sum_leaf_depth = 0;
    stats.max_leaf_depth = 0;
    stats.max_leaf_count = 0;
    stats.max_list_length = 0;
    stats.build_time = None;

    let mut node_cursor = top_nodes.len() as u32;
    let mut idx_cursor = 0u32;

    for (slot, &node) in top_nodes.iter().enumerate() {
        if !node.is_leaf() {
            continue;
        }

        let count = node.leaf_count();
        if count == 0 {
            stats.num_nodes += 1;
            stats.num_leaves += 1;
            continue;
        }
        if count > 1 {
            return Err(BspError::DegenerateGeometry(format!(
                "voxel leaf holds {count} voxels, expected at most 1"
            )));
        }

        let voxel_index = top_indices[node.leaf_index_offset() as usize];
        let path = subtree_path(base, voxel_index);

        match ooc::read_tree::<BvhNode>(&path) {
            Ok(sub) => {
                stats.merge_subtree(&sub.stats);
                let (nodes_added, indices_added) =
                    splice_one(&mut out_nodes, &mut out_indices, slot, sub.nodes, sub.indices, node_cursor, idx_cursor);
                node_cursor += nodes_added;
                idx_cursor += indices_added;
            }
            Err(e) => {
                log::warn!("could not splice voxel subtree {}: {e}", path.display());
                out_nodes[slot] = BvhNode::leaf(node.bounds(), 0, 0);
                stats.num_nodes += 1;
                stats.num_leaves += 1;
            }
        }
    }

    Ok((out_nodes, out_indices, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aabb::Aabb;
    use crate::vector::Vec3;

    fn unit_box() -> Aabb {
        Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn splices_two_single_voxel_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("scene");

        // Two trivial one-node subtrees, one per voxel.
        for voxel_index in 0..2u32 {
            let nodes = vec![BvhNode::leaf(unit_box(), 0, 1)];
            let indices = vec![voxel_index];
            let mut stats = TreeStats::default();
            stats.num_nodes = 1;
            stats.num_leaves = 1;
            stats.num_indices = 1;
            write_voxel_subtree(&base, voxel_index, &nodes, &indices, &stats).unwrap();
        }

        // Top-level BVH: one inner node, two leaves each holding one voxel.
        let top_nodes = vec![
            BvhNode::inner(unit_box(), 1, 0, 0.5),
            BvhNode::leaf(unit_box(), 0, 1),
            BvhNode::leaf(unit_box(), 1, 1),
        ];
        let top_indices = vec![0u32, 1];
        let mut top_stats = TreeStats::default();
        top_stats.num_nodes = 3;
        top_stats.num_leaves = 2;
        top_stats.num_indices = 2;

        let (nodes, indices, stats) = splice_voxel_tree(&base, &top_nodes, &top_indices, &top_stats).unwrap();

        assert!(!nodes[0].is_leaf());
        assert!(nodes[1].is_leaf());
        assert!(nodes[2].is_leaf());
        assert_eq!(indices.len(), 2);
        assert_eq!(stats.num_leaves, 2);
    }

    #[test]
    fn missing_subtree_becomes_empty_leaf_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("scene");

        let top_nodes = vec![BvhNode::leaf(unit_box(), 0, 1)];
        let top_indices = vec![0u32];
        let mut top_stats = TreeStats::default();
        top_stats.num_nodes = 1;
        top_stats.num_leaves = 1;
        top_stats.num_indices = 1;

        let (nodes, _, _) = splice_voxel_tree(&base, &top_nodes, &top_indices, &top_stats).unwrap();
        assert!(nodes[0].is_leaf());
        assert_eq!(nodes[0].leaf_count(), 0);
    }

    #[test]
    fn overfull_leaf_is_rejected() {
        let top_nodes = vec![BvhNode::leaf(unit_box(), 0, 2)];
        let top_indices = vec![0u32, 1];
        let top_stats = TreeStats::default();
        let result = splice_voxel_tree(Path::new("/tmp/unused"), &top_nodes, &top_indices, &top_stats);
        assert!(matches!(result, Err(BspError::DegenerateGeometry(_))));
    }
}
