//! Locally indexed geometry and the dense renumbering shared by object
//! extraction and LOD decimation.

/// A vertex/face set whose indices form a dense, zero-based range.
///
/// Invariants when produced by [`reindex`]:
/// - every index appearing in `faces` is `< vertices.len()`;
/// - every entry of `vertices` is referenced by at least one face;
/// - every face has at least three corners.
///
/// The vertex array is an owned copy, so the geometry outlives the model it
/// was extracted from and can be cached on its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedGeometry {
    /// Vertex positions, renumbered to `0..n`.
    pub vertices: Vec<[f32; 3]>,
    /// Faces as ordered corner lists of local vertex indices.
    pub faces: Vec<Vec<u32>>,
}

impl IndexedGeometry {
    /// Creates an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there is nothing to draw (no vertices or no faces).
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces (polygons, before triangulation).
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles a fan triangulation of every face produces.
    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|face| face.len().saturating_sub(2))
            .sum()
    }

    /// Checks the dense-indexing invariants documented on the type.
    pub fn is_dense(&self) -> bool {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            if face.len() < 3 {
                return false;
            }
            for &idx in face {
                match used.get_mut(idx as usize) {
                    Some(slot) => *slot = true,
                    None => return false,
                }
            }
        }
        used.into_iter().all(|u| u)
    }
}

/// Renumbers `faces` (indices into `source`) into a compact [`IndexedGeometry`].
///
/// Corners pointing past the end of `source` are discarded, then faces left
/// with fewer than three corners are dropped. The distinct indices of the
/// surviving faces are sorted ascending and assigned `0..n` in that order,
/// so identical input always yields identical output.
pub fn reindex<I>(source: &[[f32; 3]], faces: I) -> IndexedGeometry
where
    I: IntoIterator,
    I::Item: AsRef<[u32]>,
{
    let mut kept: Vec<Vec<u32>> = Vec::new();
    let mut dropped = 0usize;

    for face in faces {
        let corners: Vec<u32> = face
            .as_ref()
            .iter()
            .copied()
            .filter(|&idx| (idx as usize) < source.len())
            .collect();
        if corners.len() < 3 {
            dropped += 1;
            continue;
        }
        kept.push(corners);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "skipped faces with fewer than 3 valid corners");
    }

    let mut used: Vec<u32> = kept.iter().flatten().copied().collect();
    used.sort_unstable();
    used.dedup();

    // `used` holds every index of `kept`, so the partition point is the exact
    // position of the index.
    for face in &mut kept {
        for idx in face.iter_mut() {
            *idx = used.partition_point(|&u| u < *idx) as u32;
        }
    }

    IndexedGeometry {
        vertices: used.iter().map(|&idx| source[idx as usize]).collect(),
        faces: kept,
    }
}
