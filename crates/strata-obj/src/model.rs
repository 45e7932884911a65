//! The parsed, read-only model.

use std::collections::BTreeSet;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::ObjError;
use crate::face::Face;
use crate::parser;

/// Object name used for faces that appear before any object/group record.
pub const DEFAULT_OBJECT_NAME: &str = "default";

/// A named object: its name and the ids of its faces in file order.
///
/// Face ids index [`ParsedModel::faces`]; objects partition the face list.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedObject {
    /// Unique object name.
    pub name: String,
    /// Ids into the model's flat face list, in file order.
    pub face_ids: Vec<usize>,
}

impl NamedObject {
    /// Number of faces belonging to this object.
    pub fn face_count(&self) -> usize {
        self.face_ids.len()
    }
}

/// Counts derived on demand from a [`ParsedModel`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelStatistics {
    /// Number of vertex records.
    pub vertices: usize,
    /// Number of faces kept after validation.
    pub faces: usize,
    /// Number of named objects with at least one face.
    pub objects: usize,
    /// Number of normal records.
    pub normals: usize,
    /// Number of texture coordinate records.
    pub texcoords: usize,
    /// Number of distinct material names used.
    pub materials: usize,
}

/// Geometry parsed from one model file.
///
/// Created by a single parse call and never mutated afterwards; a reload
/// produces a new model. Every face corner is guaranteed to reference an
/// existing vertex, and optional texture coordinate/normal references are
/// guaranteed to be in range.
#[derive(Clone, Debug, Default)]
pub struct ParsedModel {
    pub(crate) vertices: Vec<[f32; 3]>,
    pub(crate) normals: Vec<[f32; 3]>,
    pub(crate) texcoords: Vec<[f32; 2]>,
    pub(crate) faces: Vec<Face>,
    pub(crate) objects: Vec<NamedObject>,
    pub(crate) object_lookup: FxHashMap<String, usize>,
    pub(crate) materials: Vec<String>,
}

impl ParsedModel {
    /// Reads and parses the model file at `path`.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ObjError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ObjError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| ObjError::Encoding {
            path: path.to_path_buf(),
        })?;

        let model = Self::parse_str(&text)?;
        let stats = model.statistics();
        tracing::info!(
            path = %path.display(),
            vertices = stats.vertices,
            faces = stats.faces,
            objects = stats.objects,
            "parsed model"
        );
        Ok(model)
    }

    /// Parses model text held in memory.
    pub fn parse_str(text: &str) -> Result<Self, ObjError> {
        parser::parse(text)
    }

    /// Global vertex positions.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    /// Global file-supplied normals.
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// Global texture coordinates.
    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.texcoords
    }

    /// All faces in file order.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Objects in order of first appearance.
    pub fn objects(&self) -> &[NamedObject] {
        &self.objects
    }

    /// Object names in order of first appearance.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|o| o.name.as_str())
    }

    /// Looks up an object by name.
    pub fn object(&self, name: &str) -> Option<&NamedObject> {
        self.object_lookup.get(name).map(|&i| &self.objects[i])
    }

    /// Faces of the named object in file order, or `None` if it is unknown.
    pub fn object_faces(&self, name: &str) -> Option<impl Iterator<Item = &Face>> {
        self.object(name)
            .map(|object| object.face_ids.iter().map(|&id| &self.faces[id]))
    }

    /// Material names in the order they were used.
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Counts vertices, faces, objects, normals, texture coordinates and
    /// distinct materials.
    pub fn statistics(&self) -> ModelStatistics {
        ModelStatistics {
            vertices: self.vertices.len(),
            faces: self.faces.len(),
            objects: self.objects.len(),
            normals: self.normals.len(),
            texcoords: self.texcoords.len(),
            materials: self
                .materials
                .iter()
                .map(String::as_str)
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }
}
