use crate::aabb::Aabb;
use crate::triangle::Triangle;
use crate::vector::Vec3;
use crate::voxel::Voxel;

/// Common interface over the two primitive kinds the BVH builder (and its
/// traversal) can be instantiated for.
pub trait Primitive {
    fn aabb(&self) -> Aabb;

    fn centroid(&self) -> Vec3 {
        self.aabb().centroid()
    }
}

impl Primitive for Triangle {
    fn aabb(&self) -> Aabb {
        Triangle::aabb(self)
    }

    fn centroid(&self) -> Vec3 {
        Triangle::centroid(self)
    }
}

impl Primitive for Voxel {
    fn aabb(&self) -> Aabb {
        Voxel::aabb(self)
    }
}
