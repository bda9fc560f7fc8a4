//! Packed node representation shared by the k-d tree and the BVH.
//!
//! Every child pair is stored contiguously (the right child always sits at
//! `left_index + 1`), so a node only needs to remember the index of its left
//! child. That index is packed into the high 30 bits of a `u32`, leaving the
//! low 2 bits free for a tag: `0` marks a leaf, `1..=3` mark an inner node
//! split on axis X/Y/Z respectively. This is the portable redesign flagged in
//! the distilled spec's Design Notes: the original C++ packed the axis into
//! the low bits of an aligned heap pointer, which has no meaning once nodes
//! live in a flat array with possibly-unaligned byte offsets, so here the
//! *index* itself is pre-shifted instead.

use bytemuck::{Pod, Zeroable};

const TAG_MASK: u32 = 0b11;

#[inline]
pub fn pack(payload: u32, tag: u8) -> u32 {
    debug_assert!(tag <= 3);
    (payload << 2) | tag as u32
}

#[inline]
pub fn tag(word: u32) -> u8 {
    (word & TAG_MASK) as u8
}

#[inline]
pub fn payload(word: u32) -> u32 {
    word >> 2
}

/// 8-byte packed k-d/BSP tree node: no bounds are stored, since a k-d node's
/// bounds can always be recomputed from its parent's bounds plus the split
/// plane.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct KdNode {
    child_or_index: u32,
    split_or_count: f32,
}

impl KdNode {
    pub fn leaf(index_offset: u32, count: u32) -> Self {
        KdNode {
            child_or_index: pack(index_offset, 0),
            split_or_count: count as f32,
        }
    }

    pub fn inner(left_child_index: u32, axis: usize, split_coord: f32) -> Self {
        debug_assert!(axis < 3);
        KdNode {
            child_or_index: pack(left_child_index, (axis + 1) as u8),
            split_or_count: split_coord,
        }
    }

    pub fn is_leaf(&self) -> bool {
        tag(self.child_or_index) == 0
    }

    /// Split axis, 0=X, 1=Y, 2=Z. Only meaningful for inner nodes.
    pub fn axis(&self) -> usize {
        debug_assert!(!self.is_leaf());
        tag(self.child_or_index) as usize - 1
    }

    pub fn split_coord(&self) -> f32 {
        debug_assert!(!self.is_leaf());
        self.split_or_count
    }

    pub fn left_child_index(&self) -> u32 {
        debug_assert!(!self.is_leaf());
        payload(self.child_or_index)
    }

    pub fn leaf_index_offset(&self) -> u32 {
        debug_assert!(self.is_leaf());
        payload(self.child_or_index)
    }

    pub fn leaf_count(&self) -> u32 {
        debug_assert!(self.is_leaf());
        self.split_or_count as u32
    }

    pub(crate) fn shift_leaf_offset(&mut self, delta: u32) {
        debug_assert!(self.is_leaf());
        let offset = payload(self.child_or_index) + delta;
        self.child_or_index = pack(offset, 0);
    }

    pub(crate) fn shift_child_index(&mut self, delta: u32) {
        debug_assert!(!self.is_leaf());
        let axis_tag = tag(self.child_or_index);
        let index = payload(self.child_or_index) + delta;
        self.child_or_index = pack(index, axis_tag);
    }
}

/// Packed BVH node. Unlike the k-d node, BVH leaves partition primitives
/// arbitrarily, so bounds cannot be derived from an ancestor's bounds and
/// split plane; every node carries its own AABB inline. The inner-node
/// `split_or_count` field still stores a split-plane coordinate, exactly as
/// the k-d node does (the original C++ shares one node struct, and one
/// traversal routine, between its k-d tree and its voxel BVH) — here it is
/// the pivot the BVH builder partitioned primitives against (the midpoint of
/// the node bounds along the chosen axis), which makes the two node kinds
/// traversable by the same generic loop (see [`PackedNode`]).
///
/// `min`/`max` are stored as plain `[f32; 3]` rather than `crate::vector::Vec3`
/// (a `cgmath::Vector3<f32>`): `cgmath` does not implement `bytemuck::Pod` for
/// its vector types, so a `#[derive(Pod)]` struct cannot embed one directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BvhNode {
    min: [f32; 3],
    max: [f32; 3],
    child_or_index: u32,
    split_or_count: f32,
}

impl BvhNode {
    pub fn leaf(bounds: crate::aabb::Aabb, index_offset: u32, count: u32) -> Self {
        BvhNode {
            min: bounds.min.into(),
            max: bounds.max.into(),
            child_or_index: pack(index_offset, 0),
            split_or_count: count as f32,
        }
    }

    pub fn inner(bounds: crate::aabb::Aabb, left_child_index: u32, axis: usize, split_coord: f32) -> Self {
        debug_assert!(axis < 3);
        BvhNode {
            min: bounds.min.into(),
            max: bounds.max.into(),
            child_or_index: pack(left_child_index, (axis + 1) as u8),
            split_or_count: split_coord,
        }
    }

    pub fn bounds(&self) -> crate::aabb::Aabb {
        crate::aabb::Aabb {
            min: self.min.into(),
            max: self.max.into(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        tag(self.child_or_index) == 0
    }

    pub fn axis(&self) -> usize {
        debug_assert!(!self.is_leaf());
        tag(self.child_or_index) as usize - 1
    }

    pub fn split_coord(&self) -> f32 {
        debug_assert!(!self.is_leaf());
        self.split_or_count
    }

    pub fn left_child_index(&self) -> u32 {
        debug_assert!(!self.is_leaf());
        payload(self.child_or_index)
    }

    pub fn leaf_index_offset(&self) -> u32 {
        debug_assert!(self.is_leaf());
        payload(self.child_or_index)
    }

    pub fn leaf_count(&self) -> u32 {
        debug_assert!(self.is_leaf());
        self.split_or_count as u32
    }

    pub(crate) fn shift_leaf_offset(&mut self, delta: u32) {
        debug_assert!(self.is_leaf());
        let offset = payload(self.child_or_index) + delta;
        self.child_or_index = pack(offset, 0);
    }

    pub(crate) fn shift_child_index(&mut self, delta: u32) {
        debug_assert!(!self.is_leaf());
        let axis_tag = tag(self.child_or_index);
        let index = payload(self.child_or_index) + delta;
        self.child_or_index = pack(index, axis_tag);
    }
}

/// Common interface the generic traversal loop in [`crate::traversal`] needs
/// from a node type: leaf/inner discrimination, the tagged split axis, the
/// split-plane coordinate, and contiguous child indexing. Implemented by
/// both [`KdNode`] and [`BvhNode`] so one traversal routine serves both tree
/// kinds, per the shared node layout and traversal engine this crate ports
/// from the original C++.
pub trait PackedNode: Copy {
    fn is_leaf(&self) -> bool;
    fn axis(&self) -> usize;
    fn split_coord(&self) -> f32;
    fn left_child_index(&self) -> u32;
    fn leaf_index_offset(&self) -> u32;
    fn leaf_count(&self) -> u32;
}

impl PackedNode for KdNode {
    fn is_leaf(&self) -> bool {
        KdNode::is_leaf(self)
    }
    fn axis(&self) -> usize {
        KdNode::axis(self)
    }
    fn split_coord(&self) -> f32 {
        KdNode::split_coord(self)
    }
    fn left_child_index(&self) -> u32 {
        KdNode::left_child_index(self)
    }
    fn leaf_index_offset(&self) -> u32 {
        KdNode::leaf_index_offset(self)
    }
    fn leaf_count(&self) -> u32 {
        KdNode::leaf_count(self)
    }
}

impl PackedNode for BvhNode {
    fn is_leaf(&self) -> bool {
        BvhNode::is_leaf(self)
    }
    fn axis(&self) -> usize {
        BvhNode::axis(self)
    }
    fn split_coord(&self) -> f32 {
        BvhNode::split_coord(self)
    }
    fn left_child_index(&self) -> u32 {
        BvhNode::left_child_index(self)
    }
    fn leaf_index_offset(&self) -> u32 {
        BvhNode::leaf_index_offset(self)
    }
    fn leaf_count(&self) -> u32 {
        BvhNode::leaf_count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_tag_is_zero() {
        let n = KdNode::leaf(10, 3);
        assert!(n.is_leaf());
        assert_eq!(n.leaf_index_offset(), 10);
        assert_eq!(n.leaf_count(), 3);
    }

    #[test]
    fn inner_tag_encodes_axis() {
        let n = KdNode::inner(4, 1, 2.5);
        assert!(!n.is_leaf());
        assert_eq!(n.axis(), 1);
        assert_eq!(n.left_child_index(), 4);
        assert_eq!(n.split_coord(), 2.5);
    }

    #[test]
    fn pack_roundtrips_arbitrary_payload() {
        let w = pack(123_456, 2);
        assert_eq!(tag(w), 2);
        assert_eq!(payload(w), 123_456);
    }

    #[test]
    fn bvh_node_carries_bounds() {
        use crate::aabb::Aabb;
        use crate::vector::Vec3;
        let b = Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let n = BvhNode::leaf(b, 0, 2);
        assert!(n.is_leaf());
        assert_eq!(n.bounds(), b);
        assert_eq!(n.leaf_count(), 2);
    }

    #[test]
    fn bvh_inner_node_carries_split_coord_like_kd() {
        use crate::aabb::Aabb;
        use crate::vector::Vec3;
        let b = Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(2.0, 2.0, 2.0),
        };
        let n = BvhNode::inner(b, 1, 0, 1.0);
        assert!(!n.is_leaf());
        assert_eq!(n.axis(), 0);
        assert_eq!(n.split_coord(), 1.0);
        assert_eq!(n.left_child_index(), 1);
    }
}
