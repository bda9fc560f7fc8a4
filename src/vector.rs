//! Small helpers around `cgmath::Vector3<f32>`, the vector type shared by every
//! module in this crate.

use cgmath::Vector3;

pub type Vec3 = Vector3<f32>;

/// Index (0, 1 or 2) of the component with the largest value.
///
/// Used to pick the longest axis of an AABB's extent, or the dominant axis of
/// a triangle's plane normal.
pub fn max_axis(v: Vec3) -> usize {
    if v.x > v.y && v.x > v.z {
        0
    } else if v.y > v.z {
        1
    } else {
        2
    }
}

/// Index of the component with the largest *absolute* value.
pub fn max_abs_axis(v: Vec3) -> usize {
    max_axis(Vector3::new(v.x.abs(), v.y.abs(), v.z.abs()))
}

/// Index by axis number, for code that picks an axis at runtime.
pub fn component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        2 => v.z,
        _ => unreachable!("axis must be 0, 1 or 2, got {axis}"),
    }
}

pub fn with_component(mut v: Vec3, axis: usize, value: f32) -> Vec3 {
    match axis {
        0 => v.x = value,
        1 => v.y = value,
        2 => v.z = value,
        _ => unreachable!("axis must be 0, 1 or 2, got {axis}"),
    }
    v
}

/// The two axes other than `axis`, in ascending order.
pub fn other_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        2 => (0, 1),
        _ => unreachable!("axis must be 0, 1 or 2, got {axis}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_axis_picks_largest() {
        assert_eq!(max_axis(Vec3::new(1.0, 2.0, 3.0)), 2);
        assert_eq!(max_axis(Vec3::new(5.0, 2.0, 3.0)), 0);
        assert_eq!(max_axis(Vec3::new(1.0, 9.0, 3.0)), 1);
    }

    #[test]
    fn other_axes_excludes_given_axis() {
        assert_eq!(other_axes(0), (1, 2));
        assert_eq!(other_axes(1), (0, 2));
        assert_eq!(other_axes(2), (0, 1));
    }
}
