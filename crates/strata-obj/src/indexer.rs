//! Per-object extraction with dense local renumbering.
//!
//! [`ParsedModel::object_geometry`] is the reduced path used for LOD
//! generation and display: only vertex references are followed.
//! [`ParsedModel::split_object`] is the format-preserving variant that also
//! remaps texture coordinate and normal references in lock-step, so a split
//! object can be written back out without losing attributes.

use strata_mesh::{IndexedGeometry, reindex};

use crate::face::{Face, FaceRef};
use crate::model::ParsedModel;

/// Face and vertex counts for one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object name.
    pub name: String,
    /// Number of faces.
    pub faces: usize,
    /// Number of distinct vertices referenced by those faces.
    pub vertices: usize,
}

/// A self-contained copy of one object with all three attribute streams
/// renumbered to dense, zero-based ranges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitObject {
    /// Object name.
    pub name: String,
    /// Referenced vertices, in ascending order of their original index.
    pub vertices: Vec<[f32; 3]>,
    /// Referenced texture coordinates, in ascending original order.
    pub texcoords: Vec<[f32; 2]>,
    /// Referenced normals, in ascending original order.
    pub normals: Vec<[f32; 3]>,
    /// Faces rewritten to the local indices above.
    pub faces: Vec<Face>,
    /// Original (model-wide) index of each entry of `vertices`.
    pub vertex_indices: Vec<u32>,
}

/// Sorted, deduplicated set of original indices; position in the set is the
/// new local index.
struct DenseMap(Vec<u32>);

impl DenseMap {
    fn from_unsorted(mut indices: Vec<u32>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    fn local(&self, original: u32) -> u32 {
        self.0.partition_point(|&i| i < original) as u32
    }

    fn gather<T: Copy>(&self, source: &[T]) -> Vec<T> {
        self.0.iter().map(|&i| source[i as usize]).collect()
    }
}

impl ParsedModel {
    /// Extracts the named object as a dense [`IndexedGeometry`] holding
    /// vertex positions only.
    ///
    /// Returns an empty geometry for an unknown object or one without usable
    /// faces.
    pub fn object_geometry(&self, name: &str) -> IndexedGeometry {
        let Some(faces) = self.object_faces(name) else {
            return IndexedGeometry::new();
        };
        reindex(
            &self.vertices,
            faces.map(|face| face.iter().map(|r| r.vertex).collect::<Vec<u32>>()),
        )
    }

    /// Extracts the named object with vertex, texture coordinate and normal
    /// references all renumbered.
    pub fn split_object(&self, name: &str) -> Option<SplitObject> {
        let faces: Vec<&Face> = self.object_faces(name)?.collect();
        let corners = || faces.iter().flat_map(|f| f.iter());

        let vertex_map = DenseMap::from_unsorted(corners().map(|r| r.vertex).collect());
        let texcoord_map = DenseMap::from_unsorted(corners().filter_map(|r| r.texcoord).collect());
        let normal_map = DenseMap::from_unsorted(corners().filter_map(|r| r.normal).collect());

        let remapped: Vec<Face> = faces
            .iter()
            .map(|face| {
                face.iter()
                    .map(|r| FaceRef {
                        vertex: vertex_map.local(r.vertex),
                        texcoord: r.texcoord.map(|t| texcoord_map.local(t)),
                        normal: r.normal.map(|n| normal_map.local(n)),
                    })
                    .collect::<Face>()
            })
            .collect();

        Some(SplitObject {
            name: name.to_string(),
            vertices: vertex_map.gather(&self.vertices),
            texcoords: texcoord_map.gather(&self.texcoords),
            normals: normal_map.gather(&self.normals),
            faces: remapped,
            vertex_indices: vertex_map.0,
        })
    }

    /// Splits every object, in order of first appearance.
    pub fn split_objects(&self) -> Vec<SplitObject> {
        self.objects
            .iter()
            .filter_map(|o| self.split_object(&o.name))
            .collect()
    }

    /// Face and distinct-vertex counts per object, in order of first
    /// appearance.
    pub fn object_summaries(&self) -> Vec<ObjectSummary> {
        self.objects
            .iter()
            .map(|object| {
                let mut used: Vec<u32> = object
                    .face_ids
                    .iter()
                    .flat_map(|&id| self.faces[id].iter().map(|r| r.vertex))
                    .collect();
                used.sort_unstable();
                used.dedup();
                ObjectSummary {
                    name: object.name.clone(),
                    faces: object.face_count(),
                    vertices: used.len(),
                }
            })
            .collect()
    }
}
