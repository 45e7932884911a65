//! Flat vertex/normal/index buffers ready for immediate GPU upload.
//!
//! [`build_buffers`] fan-triangulates every face of an [`IndexedGeometry`]
//! and computes smooth per-vertex normals by accumulating the unnormalised
//! cross product of each triangle into its three corners, so larger
//! triangles weigh more.

use glam::Vec3;

use crate::geometry::IndexedGeometry;

/// Normal emitted for vertices that touch no non-degenerate triangle.
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Packed render buffers for one level of detail of one object.
///
/// `vertices` and `normals` are flattened `x0, y0, z0, x1, ...` in vertex
/// order and always have equal length. `indices` holds three entries per
/// triangle. An empty set (index count 0) is a valid "nothing to draw" value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedBuffers {
    /// Flat vertex positions, `3 * V` floats.
    pub vertices: Vec<f32>,
    /// Flat unit normals, `3 * V` floats.
    pub normals: Vec<f32>,
    /// Triangle list indices, `3 * T` entries.
    pub indices: Vec<u32>,
}

impl PackedBuffers {
    /// Creates an empty buffer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no triangles to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of vertices (`vertices.len() / 3`).
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of indices to submit in a draw call. Always a multiple of 3.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex positions as raw bytes (zero-copy).
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Normals as raw bytes (zero-copy).
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Indices as raw bytes (zero-copy).
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Total size of all three buffers in bytes.
    pub fn byte_size(&self) -> usize {
        self.vertex_bytes().len() + self.normal_bytes().len() + self.index_bytes().len()
    }
}

/// Triangulates `geometry` and packs it into [`PackedBuffers`].
///
/// Each face `[c0, c1, ..., ck]` becomes the fan `(c0, ci, ci+1)` for
/// `i in 1..k`. Triangles whose cross product is zero contribute indices but
/// no normal. Faces referencing a vertex outside the geometry are skipped.
pub fn build_buffers(geometry: &IndexedGeometry) -> PackedBuffers {
    if geometry.is_empty() {
        return PackedBuffers::new();
    }

    let positions: Vec<Vec3> = geometry
        .vertices
        .iter()
        .map(|&v| Vec3::from_array(v))
        .collect();
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    let mut indices = Vec::with_capacity(geometry.triangle_count() * 3);
    let mut degenerate = 0usize;
    let mut invalid_faces = 0usize;

    for face in &geometry.faces {
        if face.len() < 3 {
            invalid_faces += 1;
            continue;
        }
        if face.iter().any(|&idx| idx as usize >= positions.len()) {
            invalid_faces += 1;
            continue;
        }

        let i0 = face[0];
        for pair in face[1..].windows(2) {
            let (i1, i2) = (pair[0], pair[1]);
            indices.extend_from_slice(&[i0, i1, i2]);

            let v0 = positions[i0 as usize];
            let normal = (positions[i1 as usize] - v0).cross(positions[i2 as usize] - v0);
            if normal.length_squared() == 0.0 || !normal.is_finite() {
                degenerate += 1;
                continue;
            }
            accumulated[i0 as usize] += normal;
            accumulated[i1 as usize] += normal;
            accumulated[i2 as usize] += normal;
        }
    }

    if degenerate > 0 || invalid_faces > 0 {
        tracing::debug!(degenerate, invalid_faces, "skipped degenerate geometry");
    }

    let default_normal = Vec3::from_array(DEFAULT_NORMAL);
    let normals = accumulated
        .iter()
        .flat_map(|n| n.try_normalize().unwrap_or(default_normal).to_array())
        .collect();

    PackedBuffers {
        vertices: geometry.vertices.iter().flatten().copied().collect(),
        normals,
        indices,
    }
}
