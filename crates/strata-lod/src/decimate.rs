//! Stride-sampling face decimation.
//!
//! Level `i` keeps every `step`-th face of the full-detail geometry, where
//! `target = max(1, floor(n * factor))` and `step = max(1, floor(n / target))`,
//! then truncates to `target` faces and compacts the vertex array. The
//! sampling is positional, not error-metric driven: it can remove visually
//! important faces, which is acceptable for distance-based substitution only.

use strata_mesh::{IndexedGeometry, reindex};

/// Number of levels in every [`LodSet`].
pub const LOD_COUNT: usize = 4;

/// Fraction of level-0 faces kept at each level.
pub const LOD_REDUCTION_FACTORS: [f64; LOD_COUNT] = [1.0, 0.5, 0.25, 0.1];

/// Four geometries for one object, from full detail (index 0) to coarsest
/// (index 3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LodSet {
    levels: [IndexedGeometry; LOD_COUNT],
}

impl LodSet {
    /// Returns all levels, finest first.
    pub fn levels(&self) -> &[IndexedGeometry; LOD_COUNT] {
        &self.levels
    }

    /// Returns level `lod`, or `None` if `lod >= LOD_COUNT`.
    pub fn level(&self, lod: usize) -> Option<&IndexedGeometry> {
        self.levels.get(lod)
    }

    /// The full-detail level.
    pub fn full(&self) -> &IndexedGeometry {
        &self.levels[0]
    }

    /// The coarsest level.
    pub fn coarsest(&self) -> &IndexedGeometry {
        &self.levels[LOD_COUNT - 1]
    }

    /// Iterates over the levels, finest first.
    pub fn iter(&self) -> impl Iterator<Item = &IndexedGeometry> {
        self.levels.iter()
    }

    /// Consumes the set, returning the owned levels.
    pub fn into_levels(self) -> [IndexedGeometry; LOD_COUNT] {
        self.levels
    }
}

/// Face budget and sampling stride for decimating `face_count` faces by
/// `factor`.
fn stride_plan(face_count: usize, factor: f64) -> (usize, usize) {
    let target = ((face_count as f64 * factor).floor() as usize).max(1);
    let step = (face_count / target).max(1);
    (target, step)
}

/// Reduces `geometry` to roughly `factor` of its faces.
///
/// A factor of `1.0` or more returns an unchanged copy.
pub fn decimate(geometry: &IndexedGeometry, factor: f64) -> IndexedGeometry {
    if factor >= 1.0 {
        return geometry.clone();
    }

    let (target, step) = stride_plan(geometry.face_count(), factor);
    let reduced = reindex(
        &geometry.vertices,
        geometry.faces.iter().step_by(step).take(target),
    );

    tracing::trace!(
        from = geometry.face_count(),
        to = reduced.face_count(),
        target,
        step,
        "decimated geometry"
    );
    reduced
}

/// Builds the four-level ladder for `geometry` using
/// [`LOD_REDUCTION_FACTORS`]. Level 0 is the input itself.
pub fn generate_lods(geometry: &IndexedGeometry) -> LodSet {
    LodSet {
        levels: LOD_REDUCTION_FACTORS.map(|factor| decimate(geometry, factor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A strip of `n` triangles; face `i` uses vertices `i, i+1, i+2`.
    fn strip(n: usize) -> IndexedGeometry {
        IndexedGeometry {
            vertices: (0..n + 2).map(|i| [i as f32, (i % 2) as f32, 0.0]).collect(),
            faces: (0..n as u32).map(|i| vec![i, i + 1, i + 2]).collect(),
        }
    }

    /// Identifies a face of `strip` by its first original vertex.
    fn first_x(geometry: &IndexedGeometry, face: usize) -> f32 {
        geometry.vertices[geometry.faces[face][0] as usize][0]
    }

    #[test]
    fn test_level_zero_is_input() {
        let geometry = strip(10);
        let lods = generate_lods(&geometry);
        assert_eq!(lods.full(), &geometry);
        assert_eq!(lods.levels().len(), LOD_COUNT);
    }

    #[test]
    fn test_even_stride_sampling() {
        let lods = generate_lods(&strip(10));
        let kept: Vec<Vec<f32>> = lods
            .iter()
            .map(|g| (0..g.face_count()).map(|f| first_x(g, f)).collect())
            .collect();
        assert_eq!(kept[1], vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(kept[2], vec![0.0, 5.0]);
        assert_eq!(kept[3], vec![0.0]);
    }

    #[test]
    fn test_overshooting_stride_is_truncated() {
        // n = 7, factor 0.5: target 3, step 2 samples 0,2,4,6 then truncates.
        let reduced = decimate(&strip(7), 0.5);
        let kept: Vec<f32> = (0..reduced.face_count())
            .map(|f| first_x(&reduced, f))
            .collect();
        assert_eq!(kept, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_face_count_matches_target_for_all_sizes() {
        for n in 0..200 {
            let geometry = strip(n);
            for &factor in &LOD_REDUCTION_FACTORS[1..] {
                let target = ((n as f64 * factor).floor() as usize).max(1);
                let reduced = decimate(&geometry, factor);
                assert_eq!(
                    reduced.face_count(),
                    n.min(target),
                    "n={n} factor={factor}"
                );
                assert!(reduced.face_count() <= target);
            }
        }
    }

    #[test]
    fn test_tiny_geometry_keeps_one_face() {
        let lods = generate_lods(&strip(3));
        assert_eq!(lods.coarsest().face_count(), 1);
        assert_eq!(lods.level(1).map(IndexedGeometry::face_count), Some(1));
    }

    #[test]
    fn test_decimated_vertices_are_compact() {
        let lods = generate_lods(&strip(50));
        for (lod, geometry) in lods.iter().enumerate() {
            assert!(geometry.is_dense(), "lod {lod} has unused or invalid vertices");
        }
        // Five disjoint triangles sampled from a 50-triangle strip at step 10.
        assert_eq!(lods.coarsest().vertex_count(), 15);
    }

    #[test]
    fn test_empty_geometry_stays_empty() {
        let lods = generate_lods(&IndexedGeometry::new());
        assert!(lods.iter().all(IndexedGeometry::is_empty));
    }

    #[test]
    fn test_decimation_is_deterministic() {
        let geometry = strip(123);
        assert_eq!(generate_lods(&geometry), generate_lods(&geometry));
    }

    #[test]
    fn test_stride_plan() {
        assert_eq!(stride_plan(10, 0.5), (5, 2));
        assert_eq!(stride_plan(10, 0.1), (1, 10));
        assert_eq!(stride_plan(0, 0.25), (1, 1));
        assert_eq!(stride_plan(3, 0.1), (1, 3));
    }
}
