use cgmath::InnerSpace;

use crate::aabb::Aabb;
use crate::ray::Ray;
use crate::vector::{component, max_abs_axis, other_axes, Vec3};

/// Source triangle, as supplied by the scene loader.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
}

impl Triangle {
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&[self.p0, self.p1, self.p2])
    }

    pub fn centroid(&self) -> Vec3 {
        (self.p0 + self.p1 + self.p2) / 3.0
    }

    /// Coordinate of a vertex along `axis`; `vertex` is 0, 1 or 2.
    pub fn vertex_component(&self, vertex: usize, axis: usize) -> f32 {
        let p = match vertex {
            0 => self.p0,
            1 => self.p1,
            _ => self.p2,
        };
        component(p, axis)
    }
}

const EPSILON: f32 = 1e-9;

/// Precomputed projection-plane intersection record for one triangle.
///
/// Ray/triangle intersection is reduced to: (1) intersect the ray with the
/// triangle's plane, (2) project the hit point onto the two non-dominant
/// axes, (3) solve the 2x2 barycentric system in that plane. This struct
/// caches everything that only depends on the triangle, so step (3) touches
/// just four stored numbers per branch.
///
/// The 2x2 system is `hu = alpha*u1 + beta*u2`, `hv = alpha*v1 + beta*v2`,
/// where `(u1,v1)` and `(u2,v2)` are edges `p1-p0` and `p2-p0` projected onto
/// `(i1,i2)`, and `(hu,hv)` is the projected hit point relative to `p0`.
/// Cramer's rule gives `beta = (u1*hv - hu*v1)/D` and
/// `alpha = (hu*v2 - hv*u2)/D` with `D = u1*v2 - u2*v1`.
///
/// The "common" branch pivots on `u1` (assumed non-zero): `beta` is computed
/// from `precalc1 = u1/D` and `precalc2 = v1/u1` as
/// `beta = precalc1*(hv - hu*precalc2)`, then `alpha` falls out of the first
/// equation directly: `alpha = hu*u1inv - beta*precalc3` with
/// `precalc3 = u2/u1`. When `u1` is exactly zero this degenerates (division
/// by zero), so the "alternate" branch instead pivots on `v1`: by the same
/// derivation with the roles of axis `i1`/`i2` and `alpha`/`beta` swapped,
/// `beta = precalc1*(hu - hv*precalc2)` with `precalc1 = v1/D'`,
/// `precalc2 = u1/v1`, `D' = u2*v1 - v2*u1 = -D`, and
/// `alpha = hv*v1inv - beta*precalc3` with `precalc3 = v2/v1`.
#[derive(Clone, Copy, Debug)]
pub struct IsectTriangle {
    /// Dominant axis of the plane normal; dropped during projection.
    pub k: usize,
    pub i1: usize,
    pub i2: usize,
    pub n: Vec3,
    pub d: f32,
    /// `p0` projected onto `(i1, i2)`.
    pub p0_u: f32,
    pub p0_v: f32,
    /// `1/u1` in the common branch, `1/v1` in the alternate branch.
    pub pivot_inv: f32,
    pub precalc1: f32,
    pub precalc2: f32,
    pub precalc3: f32,
    /// `false`: common branch (pivot on edge `i1` component).
    /// `true`: alternate branch (pivot on edge `i2` component).
    pub alt_branch: bool,
}

impl IsectTriangle {
    pub fn precompute(tri: &Triangle) -> Self {
        let e1 = tri.p1 - tri.p0;
        let e2 = tri.p2 - tri.p0;
        let n = e1.cross(e2);
        let d = n.dot(tri.p0);
        let k = max_abs_axis(n);
        let (i1, i2) = other_axes(k);

        let u1 = component(e1, i1);
        let v1 = component(e1, i2);
        let u2 = component(e2, i1);
        let v2 = component(e2, i2);

        let (pivot_inv, precalc1, precalc2, precalc3, alt_branch) = if u1.abs() > EPSILON {
            let det = v2 * u1 - u2 * v1;
            (1.0 / u1, det.recip() * u1, v1 / u1, u2 / u1, false)
        } else {
            let det = u2 * v1 - v2 * u1;
            (1.0 / v1, det.recip() * v1, u1 / v1, v2 / v1, true)
        };

        IsectTriangle {
            k,
            i1,
            i2,
            n,
            d,
            p0_u: component(tri.p0, i1),
            p0_v: component(tri.p0, i2),
            pivot_inv,
            precalc1,
            precalc2,
            precalc3,
            alt_branch,
        }
    }

    /// Intersects `ray` with the precomputed triangle, returning
    /// `(t, alpha, beta)` on a hit within `(self_intersect_eps, t_max]`.
    /// `alpha` is the barycentric weight of `p1`, `beta` of `p2`; the weight
    /// of `p0` is `1 - alpha - beta`. Back-face culling is applied when
    /// `cull_back_faces` is set, by rejecting `sign*(n.dir) > -eps` with
    /// `sign = 1`.
    pub fn intersect(&self, ray: &Ray, t_max: f32, cull_back_faces: bool) -> Option<(f32, f32, f32)> {
        const SELF_HIT_EPS: f32 = 0.001;
        const PARALLEL_EPS: f32 = 1e-8;

        let denom = self.n.dot(ray.dir);
        if cull_back_faces && denom > -PARALLEL_EPS {
            return None;
        }
        if denom.abs() < PARALLEL_EPS {
            return None;
        }

        let t = (self.d - self.n.dot(ray.origin)) / denom;
        if t < SELF_HIT_EPS || t > t_max {
            return None;
        }

        let hit = ray.at(t);
        let hu = component(hit, self.i1) - self.p0_u;
        let hv = component(hit, self.i2) - self.p0_v;

        let (alpha, beta) = if !self.alt_branch {
            let beta = self.precalc1 * (hv - hu * self.precalc2);
            let alpha = hu * self.pivot_inv - beta * self.precalc3;
            (alpha, beta)
        } else {
            let beta = self.precalc1 * (hu - hv * self.precalc2);
            let alpha = hv * self.pivot_inv - beta * self.precalc3;
            (alpha, beta)
        };

        if beta < 0.0 || beta > 1.0 || alpha < 0.0 || alpha + beta > 1.0 {
            return None;
        }

        Some((t, alpha, beta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> Triangle {
        Triangle {
            p0: Vec3::new(0.0, 0.0, 0.0),
            p1: Vec3::new(1.0, 0.0, 0.0),
            p2: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    #[test]
    fn hits_center_with_equal_barycentrics() {
        let t = tri();
        let isect = IsectTriangle::precompute(&t);
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = isect.intersect(&ray, f32::INFINITY, false).expect("should hit");
        assert!((hit.0 - 1.0).abs() < 1e-4);
        assert!((hit.1 - 0.25).abs() < 1e-4);
        assert!((hit.2 - 0.25).abs() < 1e-4);
    }

    #[test]
    fn misses_outside_triangle() {
        let t = tri();
        let isect = IsectTriangle::precompute(&t);
        let ray = Ray::new(Vec3::new(5.0, 5.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(isect.intersect(&ray, f32::INFINITY, false).is_none());
    }

    #[test]
    fn rejects_self_intersection_epsilon() {
        let t = tri();
        let isect = IsectTriangle::precompute(&t);
        // Ray starting almost exactly on the plane along the normal.
        let ray = Ray::new(Vec3::new(0.1, 0.1, 0.0001), Vec3::new(0.0, 0.0, -1.0));
        assert!(isect.intersect(&ray, f32::INFINITY, false).is_none());
    }

    #[test]
    fn degenerate_u1_takes_alt_branch() {
        // p1 shares i1-coordinate with p0 along the dominant-plane axis: with
        // n = (0,0,1) (k=2, i1=0, i2=1), u1 = p1.x - p0.x must be 0.
        let t = Triangle {
            p0: Vec3::new(0.0, 0.0, 0.0),
            p1: Vec3::new(0.0, 1.0, 0.0),
            p2: Vec3::new(1.0, 0.0, 0.0),
        };
        let isect = IsectTriangle::precompute(&t);
        assert!(isect.alt_branch);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(isect.intersect(&ray, f32::INFINITY, false).is_some());
    }
}
