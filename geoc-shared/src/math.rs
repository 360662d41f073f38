use glam::{Mat3, Mat4, Vec3};

/// Coordinate axis used by per-axis rotation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Pick this axis' component out of a vector.
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    /// A vector with `value` on this axis and zero elsewhere.
    pub fn unit_scaled(self, value: f32) -> Vec3 {
        match self {
            Axis::X => Vec3::new(value, 0.0, 0.0),
            Axis::Y => Vec3::new(0.0, value, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, value),
        }
    }
}

/// OpenGL-style perspective projection, column-major, as uploaded to the
/// `projection_matrix` uniform.
pub fn projection_matrix(fov: f32, aspect_ratio: f32, near: f32, far: f32) -> [f32; 16] {
    Mat4::perspective_rh_gl(fov, aspect_ratio, near, far).to_cols_array()
}

/// Right-handed rotation of `v` by `angle` radians about `axis`.
pub fn rotate_about(v: Vec3, axis: Axis, angle: f32) -> Vec3 {
    let m = match axis {
        Axis::X => Mat3::from_rotation_x(angle),
        Axis::Y => Mat3::from_rotation_y(angle),
        Axis::Z => Mat3::from_rotation_z(angle),
    };
    m * v
}

/// Per-tick increment that sums to `total` over `frames` ticks.
pub fn linear_step(total: Vec3, frames: u32) -> Vec3 {
    total / frames.max(1) as f32
}

/// Per-tick multiplier whose `frames`-th power is `total`. Repeated scaling
/// compounds, so the step is a root rather than a quotient.
pub fn geometric_step(total: f32, frames: u32) -> f32 {
    total.powf(1.0 / frames.max(1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    // ── projection_matrix ──

    #[test]
    fn test_projection_matches_gl_layout() {
        let (fov, aspect, near, far) = (1.4f32, 1.5f32, 0.1f32, 100.0f32);
        let m = projection_matrix(fov, aspect, near, far);
        let tan_half = (fov / 2.0).tan();
        assert!(approx_eq(m[0], 1.0 / (tan_half * aspect)));
        assert!(approx_eq(m[5], 1.0 / tan_half));
        assert!(approx_eq(m[10], -(far + near) / (far - near)));
        assert!(approx_eq(m[11], -1.0));
        assert!(approx_eq(m[14], -(2.0 * far * near) / (far - near)));
        assert!(approx_eq(m[15], 0.0));
    }

    // ── rotate_about ──

    #[test]
    fn test_rotate_quarter_turns() {
        assert!(vec_approx_eq(rotate_about(Vec3::Y, Axis::X, FRAC_PI_2), Vec3::Z));
        assert!(vec_approx_eq(rotate_about(Vec3::Z, Axis::Y, FRAC_PI_2), Vec3::X));
        assert!(vec_approx_eq(rotate_about(Vec3::X, Axis::Z, FRAC_PI_2), Vec3::Y));
    }

    #[test]
    fn test_rotation_preserves_length() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        for axis in Axis::ALL {
            let r = rotate_about(v, axis, 0.7);
            assert!(approx_eq(r.length(), v.length()));
            assert!(approx_eq(axis.component(r), axis.component(v)));
        }
    }

    #[test]
    fn test_split_rotation_equals_whole() {
        let v = Vec3::new(2.0, 1.0, -1.0);
        let mut stepped = v;
        for _ in 0..25 {
            stepped = rotate_about(stepped, Axis::Z, PI / 25.0);
        }
        assert!(vec_approx_eq(stepped, rotate_about(v, Axis::Z, PI)));
    }

    // ── steps ──

    #[test]
    fn test_linear_step() {
        let step = linear_step(Vec3::new(3.0, 0.0, -5.0), 25);
        assert!(vec_approx_eq(step, Vec3::new(0.12, 0.0, -0.2)));
        assert!(vec_approx_eq(linear_step(Vec3::ONE, 0), Vec3::ONE));
    }

    #[test]
    fn test_geometric_step_compounds_to_total() {
        for &total in &[0.5f32, 2.0, 3.0, 10.0] {
            for &frames in &[1u32, 5, 25, 60] {
                let step = geometric_step(total, frames);
                let compounded = (0..frames).fold(1.0f32, |acc, _| acc * step);
                assert!(
                    (compounded - total).abs() < 1e-4 * total,
                    "total={total} frames={frames} got {compounded}"
                );
            }
        }
    }

    #[test]
    fn test_axis_unit_scaled() {
        assert_eq!(Axis::Y.unit_scaled(2.0), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(Axis::Z.component(Vec3::new(1.0, 2.0, 3.0)), 3.0);
    }
}
