/// Upper bound on k-d/BVH recursion depth, shared by two things: the
/// traversal stack's fixed capacity and the builder's depth cap (the original
/// ping-pong scratch allocator also ring-indexed its "right" buffers by this
/// constant, but Rust's ownership model makes that aliasing trick
/// unnecessary — each recursive builder call here just owns its partition
/// `Vec` outright, so there is no pool left to size).
pub const MAX_BSP_SIZE: usize = 64;
