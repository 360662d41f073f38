use glam::Vec3;

use crate::math::{rotate_about, Axis};
use crate::scene::{ReflectAxes, ShapeKind};

/// Host-side mirror of what the guest holds, kept for display only.
///
/// Vector positions are updated with the same per-tick deltas sent to the
/// guest; nothing here is ever read back into the guest.
#[derive(Debug, Clone, Default)]
pub struct ShadowCopy {
    vectors: Vec<Vec3>,
    shapes: Vec<ShapeKind>,
    cameras: Vec<String>,
}

impl ShadowCopy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_vector(&mut self, v: Vec3) {
        self.vectors.push(v);
    }

    pub fn insert_shape(&mut self, kind: ShapeKind) {
        self.shapes.push(kind);
    }

    pub fn insert_camera(&mut self) {
        let label = format!("Camera@{}", self.cameras.len());
        self.cameras.push(label);
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
        self.shapes.clear();
        self.cameras.clear();
    }

    pub fn vector(&self, index: u32) -> Option<Vec3> {
        self.vectors.get(index as usize).copied()
    }

    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }

    fn update(&mut self, indices: &[u32], f: impl Fn(Vec3) -> Vec3) {
        for &i in indices {
            match self.vectors.get_mut(i as usize) {
                Some(v) => *v = f(*v),
                None => log::debug!("shadow copy has no vector {i}"),
            }
        }
    }

    pub fn rotate(&mut self, indices: &[u32], axis: Axis, angle: f32) {
        self.update(indices, |v| rotate_about(v, axis, angle));
    }

    pub fn scale(&mut self, indices: &[u32], factor: f32) {
        self.update(indices, |v| v * factor);
    }

    pub fn translate(&mut self, indices: &[u32], delta: Vec3) {
        self.update(indices, |v| v + delta);
    }

    pub fn reflect(&mut self, indices: &[u32], axes: ReflectAxes) {
        let sign = Vec3::new(
            if axes.contains(ReflectAxes::X) { -1.0 } else { 1.0 },
            if axes.contains(ReflectAxes::Y) { -1.0 } else { 1.0 },
            if axes.contains(ReflectAxes::Z) { -1.0 } else { 1.0 },
        );
        self.update(indices, |v| v * sign);
    }

    /// One `"x, y, z"` row per vector, two decimals each.
    pub fn vector_rows(&self) -> Vec<String> {
        self.vectors
            .iter()
            .map(|v| format!("{:.2}, {:.2}, {:.2}", v.x, v.y, v.z))
            .collect()
    }

    pub fn shape_rows(&self) -> Vec<String> {
        self.shapes.iter().map(|kind| kind.label().to_string()).collect()
    }

    pub fn camera_rows(&self) -> Vec<String> {
        self.cameras.clone()
    }
}
