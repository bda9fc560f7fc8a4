use crate::aabb::Aabb;
use crate::vector::Vec3;

const PI: f32 = std::f32::consts::PI;

/// A quantized point-sample used as a BVH primitive for massive voxelized
/// scenes: packed diffuse/specular colour, a quantized surface normal
/// (theta/phi bytes), a plane offset, a material id, and an 8-byte geometry
/// occupancy bitmap (one bit per child octant), following the layout in the
/// original voxel builder.
#[derive(Clone, Copy, Debug)]
pub struct Voxel {
    pub center: Vec3,
    pub half_extent: f32,
    /// Packed 0xBBGGRR diffuse colour.
    pub kd: u32,
    /// Packed 0xBBGGRR specular colour.
    pub ks: u32,
    pub material_id: u16,
    theta: u8,
    phi: u8,
    pub geom_bitmap: [u8; 8],
    /// Signed distance of the represented surface from `center` along the
    /// quantized normal.
    pub d: f32,
}

fn pack_color(c: Vec3) -> u32 {
    let r = (c.x.clamp(0.0, 1.0) * 255.0) as u32;
    let g = (c.y.clamp(0.0, 1.0) * 255.0) as u32;
    let b = (c.z.clamp(0.0, 1.0) * 255.0) as u32;
    r | (g << 8) | (b << 16)
}

fn unpack_color(c: u32) -> Vec3 {
    let r = (c & 0xff) as f32 / 255.0;
    let g = ((c >> 8) & 0xff) as f32 / 255.0;
    let b = ((c >> 16) & 0xff) as f32 / 255.0;
    Vec3::new(r, g, b)
}

impl Voxel {
    pub fn new(center: Vec3, half_extent: f32) -> Self {
        Voxel {
            center,
            half_extent,
            kd: 0,
            ks: 0,
            material_id: 0,
            theta: 0,
            phi: 0,
            geom_bitmap: [0; 8],
            d: 0.0,
        }
    }

    pub fn set_kd(&mut self, c: Vec3) {
        self.kd = pack_color(c);
    }

    pub fn set_ks(&mut self, c: Vec3) {
        self.ks = pack_color(c);
    }

    pub fn kd(&self) -> Vec3 {
        unpack_color(self.kd)
    }

    pub fn ks(&self) -> Vec3 {
        unpack_color(self.ks)
    }

    /// Decode the quantized (theta, phi) byte pair into a unit normal.
    pub fn normal(&self) -> Vec3 {
        let theta = self.theta as f32 / 255.0 * PI;
        let phi = self.phi as f32 / 255.0 * (2.0 * PI);
        Vec3::new(
            theta.sin() * phi.cos(),
            theta.sin() * phi.sin(),
            theta.cos(),
        )
    }

    /// Quantize and store a (near-)unit normal as theta/phi bytes.
    pub fn set_normal(&mut self, n: Vec3) {
        let theta = n.z.clamp(-1.0, 1.0).acos();
        let mut phi = n.y.atan2(n.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        self.theta = (theta / PI * 255.0).round().clamp(0.0, 255.0) as u8;
        self.phi = (phi / (2.0 * PI) * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    pub fn aabb(&self) -> Aabb {
        let r = Vec3::new(self.half_extent, self.half_extent, self.half_extent);
        Aabb {
            min: self.center - r,
            max: self.center + r,
        }
    }

    pub fn occupies(&self, child: usize) -> bool {
        debug_assert!(child < 8);
        (self.geom_bitmap[child] & 1) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn normal_round_trips_within_quantization_error() {
        let mut v = Voxel::new(Vec3::new(0.0, 0.0, 0.0), 1.0);
        let n = Vec3::new(0.0, 0.0, 1.0);
        v.set_normal(n);
        let decoded = v.normal();
        assert!((decoded - n).magnitude2() < 1e-3);
    }

    #[test]
    fn color_round_trips_within_8_bit_quantization() {
        let mut v = Voxel::new(Vec3::new(0.0, 0.0, 0.0), 1.0);
        let c = Vec3::new(0.5, 0.25, 1.0);
        v.set_kd(c);
        let decoded = v.kd();
        assert!((decoded - c).magnitude2() < 1e-3);
    }

    #[test]
    fn aabb_is_centered_cube() {
        let v = Voxel::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let b = v.aabb();
        assert_eq!(b.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(b.max, Vec3::new(1.5, 2.5, 3.5));
    }
}
