use crate::vector::Vec3;

/// A ray with precomputed inverse direction and sign bits, so that an
/// AABB slab test (see [`crate::aabb::Aabb::clip_ray`]) can pick the correct
/// near/far corner per axis in O(1) without branching on the sign of the
/// direction every time.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub inv_dir: Vec3,
    /// 0 if the direction component is non-negative, 1 otherwise; indexes
    /// into `[min, max]` to pick the near corner for the slab test.
    pub sign: [usize; 3],
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        let inv_dir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            (inv_dir.x < 0.0) as usize,
            (inv_dir.y < 0.0) as usize,
            (inv_dir.z < 0.0) as usize,
        ];
        Ray {
            origin,
            dir,
            inv_dir,
            sign,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}
