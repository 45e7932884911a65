//! Centre-and-scale transforms that fit geometry into a `[-2, 2]` display cube.

use glam::{DVec3, Vec3};

use crate::geometry::IndexedGeometry;

/// Maps positions to `(p - center) * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    /// Mean of the fitted vertices.
    pub center: Vec3,
    /// `2 / max_dim`, or `1` when the fitted vertices have no extent.
    pub scale: f32,
}

impl Normalization {
    /// The transform that leaves positions unchanged.
    pub const IDENTITY: Self = Self {
        center: Vec3::ZERO,
        scale: 1.0,
    };

    /// Fits a transform to a single vertex set.
    pub fn fit(vertices: &[[f32; 3]]) -> Self {
        Self::fit_many(&[vertices])
    }

    /// Fits one shared transform to several vertex sets, treated as if they
    /// were concatenated.
    ///
    /// The centre is the arithmetic mean of all vertices and `max_dim` is the
    /// largest absolute coordinate of any vertex relative to that centre.
    /// Sums run in `f64` so large models do not lose precision.
    pub fn fit_many(sets: &[&[[f32; 3]]]) -> Self {
        let count: usize = sets.iter().map(|s| s.len()).sum();
        if count == 0 {
            return Self::IDENTITY;
        }

        let sum = sets
            .iter()
            .flat_map(|s| s.iter())
            .fold(DVec3::ZERO, |acc, v| acc + Vec3::from_array(*v).as_dvec3());
        let center = sum / count as f64;

        let max_dim = sets
            .iter()
            .flat_map(|s| s.iter())
            .map(|v| (Vec3::from_array(*v).as_dvec3() - center).abs().max_element())
            .fold(0.0_f64, f64::max);

        let scale = if max_dim > 0.0 { 2.0 / max_dim } else { 1.0 };
        Self {
            center: center.as_vec3(),
            scale: scale as f32,
        }
    }

    /// Transforms a single position.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 3] {
        ((Vec3::from_array(p) - self.center) * self.scale).to_array()
    }

    /// Transforms every vertex of `geometry` in place. Faces are untouched.
    pub fn apply(&self, geometry: &mut IndexedGeometry) {
        for v in &mut geometry.vertices {
            *v = self.transform_point(*v);
        }
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::IDENTITY
    }
}
