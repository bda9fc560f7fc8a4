use std::f32;
use std::fmt;

use crate::ray::Ray;
use crate::vector::{component, max_axis, with_component, Vec3};

/// Axis-aligned bounding box.
///
/// Ray/box intersection follows Williams, Amy, et al. "An efficient and
/// robust ray-box intersection algorithm." ACM SIGGRAPH 2005 Courses, using
/// the ray's precomputed sign bits to pick the near/far corner per axis.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Self {
        let min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        Aabb { min, max: -min }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut res = Aabb::empty();
        for p in points {
            res.add_point(*p);
        }
        res
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn add_point(&mut self, v: Vec3) {
        self.min.x = self.min.x.min(v.x);
        self.min.y = self.min.y.min(v.y);
        self.min.z = self.min.z.min(v.z);
        self.max.x = self.max.x.max(v.x);
        self.max.y = self.max.y.max(v.y);
        self.max.z = self.max.z.max(v.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        Aabb {
            min: Vec3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vec3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Axis of greatest extent; used both by the BVH builder and as the
    /// starting axis for k-d subdivision.
    pub fn longest_axis(&self) -> usize {
        max_axis(self.extent())
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Returns the two children obtained by substituting `axis` with `coord`,
    /// as k-d subdivision does when descending into a child's subbox.
    pub fn split(&self, axis: usize, coord: f32) -> (Aabb, Aabb) {
        let left = Aabb {
            min: self.min,
            max: with_component(self.max, axis, coord),
        };
        let right = Aabb {
            min: with_component(self.min, axis, coord),
            max: self.max,
        };
        (left, right)
    }

    pub fn with_min(&self, axis: usize, value: f32) -> Self {
        Aabb {
            min: with_component(self.min, axis, value),
            max: self.max,
        }
    }

    pub fn with_max(&self, axis: usize, value: f32) -> Self {
        Aabb {
            min: self.min,
            max: with_component(self.max, axis, value),
        }
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| {
            component(self.min, axis) <= component(other.min, axis) + 1e-4
                && component(self.max, axis) >= component(other.max, axis) - 1e-4
        })
    }

    /// Clip `ray` against this box, returning the `(tmin, tmax)` interval of
    /// the intersection with `[0, ray.t_max]`, or `None` if the ray misses.
    pub fn clip_ray(&self, ray: &Ray, t_max: f32) -> Option<(f32, f32)> {
        let p = [self.min, self.max];
        let sign = ray.sign;

        let mut tmin = (component(p[sign[0]], 0) - ray.origin.x) * ray.inv_dir.x;
        let mut tmax = (component(p[1 - sign[0]], 0) - ray.origin.x) * ray.inv_dir.x;
        let tymin = (component(p[sign[1]], 1) - ray.origin.y) * ray.inv_dir.y;
        let tymax = (component(p[1 - sign[1]], 1) - ray.origin.y) * ray.inv_dir.y;
        if tmin > tymax || tymin > tmax {
            return None;
        }
        tmin = tmin.max(tymin);
        tmax = tmax.min(tymax);

        let tzmin = (component(p[sign[2]], 2) - ray.origin.z) * ray.inv_dir.z;
        let tzmax = (component(p[1 - sign[2]], 2) - ray.origin.z) * ray.inv_dir.z;
        if tmin > tzmax || tzmin > tmax {
            return None;
        }
        tmin = tmin.max(tzmin);
        tmax = tmax.min(tzmax);

        if tmin < t_max && tmax > 0.0 {
            Some((tmin.max(0.0), tmax.min(t_max)))
        } else {
            None
        }
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]..[{}, {}, {}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ray::Ray;

    #[test]
    fn empty_has_no_extent() {
        let b = Aabb::empty();
        assert!(b.is_empty());
    }

    #[test]
    fn union_encloses_both() {
        let a = Aabb::from_points(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[Vec3::new(2.0, -1.0, 0.0), Vec3::new(3.0, 0.0, 0.5)]);
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(u.max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn ray_through_box_hits() {
        let b = Aabb::from_points(&[Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)]);
        let r = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(b.clip_ray(&r, f32::INFINITY).is_some());
    }

    #[test]
    fn ray_missing_box() {
        let b = Aabb::from_points(&[Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)]);
        let r = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(b.clip_ray(&r, f32::INFINITY).is_none());
    }

    #[test]
    fn split_substitutes_one_axis() {
        let b = Aabb::from_points(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0)]);
        let (left, right) = b.split(0, 1.5);
        assert_eq!(left.max.x, 1.5);
        assert_eq!(right.min.x, 1.5);
        assert_eq!(left.max.y, 2.0);
    }
}
