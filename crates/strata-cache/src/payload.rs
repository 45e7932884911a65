//! Binary encoding of cached model payloads.
//!
//! The STLC (Strata LOD Cache) format is a versioned little-endian layout.
//! A blob whose magic or version does not match is rejected rather than
//! misread, so a format change only costs a reprocess.
//!
//! ## Binary Layout
//!
//! | Field | Encoding |
//! |-------|----------|
//! | Magic | `[0x53, 0x54, 0x4C, 0x43]` ("STLC") |
//! | Version | `u8`, currently 1 |
//! | Scene objects | `u32` count, then each [`ObjectLods`] |
//! | Isolated objects | `u32` count, then each [`IsolatedObject`] |
//!
//! An [`ObjectLods`] is its name (`u32` byte length + UTF-8), a `u8` level
//! count (always [`LOD_COUNT`]) and that many buffer sets. A buffer set is
//! three length-prefixed arrays: vertex `f32`s, normal `f32`s and `u32`
//! indices. An [`IsolatedObject`] is an [`ObjectLods`] followed by its
//! geometry: a `u32` vertex count with `3 × f32` each, then a `u32` face count
//! with each face a `u32` corner count and that many `u32` indices.

use strata_lod::LOD_COUNT;
use strata_mesh::{IndexedGeometry, PackedBuffers};

/// Magic bytes identifying the STLC format.
const MAGIC: [u8; 4] = [0x53, 0x54, 0x4C, 0x43];

/// Current format version.
pub const PAYLOAD_VERSION: u8 = 1;

/// Errors that can occur while encoding or decoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The data is shorter than its headers claim.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// An object does not carry exactly [`LOD_COUNT`] levels.
    #[error("expected 4 LOD levels, found {0}")]
    InvalidLodCount(u8),
    /// Vertex and normal arrays disagree or are not made of whole triples.
    #[error("malformed buffers: {0}")]
    MalformedBuffers(&'static str),
    /// An index points past the end of the vertex array.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index.
        index: u32,
        /// Number of vertices available.
        vertex_count: usize,
    },
    /// An object name is not valid UTF-8.
    #[error("object name is not valid UTF-8")]
    InvalidName,
    /// An array is too long for a `u32` length prefix.
    #[error("array of {0} elements is too large to encode")]
    TooLarge(usize),
    /// Bytes remain after the last object.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

/// The four LOD buffer sets of one object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectLods {
    /// Object name.
    pub name: String,
    /// Buffers for levels 0 (full detail) to 3 (coarsest).
    pub lods: [PackedBuffers; LOD_COUNT],
}

/// An object normalised on its own, with its normalised geometry kept for
/// single-object display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IsolatedObject {
    /// Buffers built from the individually normalised geometry.
    pub buffers: ObjectLods,
    /// The individually normalised full-detail geometry.
    pub geometry: IndexedGeometry,
}

/// Everything cached for one source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachedModel {
    /// Objects sharing one scene-wide normalisation, in model order.
    pub scene: Vec<ObjectLods>,
    /// Objects normalised individually, in model order.
    pub isolated: Vec<IsolatedObject>,
}

impl CachedModel {
    /// Number of objects in the scene rendition.
    pub fn object_count(&self) -> usize {
        self.scene.len()
    }

    /// Finds an object of the scene rendition by name.
    pub fn scene_object(&self, name: &str) -> Option<&ObjectLods> {
        self.scene.iter().find(|o| o.name == name)
    }

    /// Finds an object of the isolated rendition by name.
    pub fn isolated_object(&self, name: &str) -> Option<&IsolatedObject> {
        self.isolated.iter().find(|o| o.buffers.name == name)
    }

    /// Serializes this model to a byte vector in the STLC format.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let mut w = Writer::default();
        w.buf.extend_from_slice(&MAGIC);
        w.buf.push(PAYLOAD_VERSION);

        w.len(self.scene.len())?;
        for object in &self.scene {
            w.object(object)?;
        }

        w.len(self.isolated.len())?;
        for object in &self.isolated {
            w.object(&object.buffers)?;
            w.geometry(&object.geometry)?;
        }
        Ok(w.buf)
    }

    /// Deserializes a model from a byte slice in the STLC format.
    ///
    /// Returns an error if the data is corrupted, has an unrecognized version,
    /// or is truncated.
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() < 4 || data[0..4] != MAGIC {
            return Err(PayloadError::InvalidMagic);
        }
        let mut r = Reader { data, pos: 4 };
        let version = r.u8()?;
        if version != PAYLOAD_VERSION {
            return Err(PayloadError::UnsupportedVersion(version));
        }

        let scene_count = r.u32()? as usize;
        let mut scene = Vec::new();
        for _ in 0..scene_count {
            scene.push(r.object()?);
        }

        let isolated_count = r.u32()? as usize;
        let mut isolated = Vec::new();
        for _ in 0..isolated_count {
            let buffers = r.object()?;
            let geometry = r.geometry()?;
            isolated.push(IsolatedObject { buffers, geometry });
        }

        if r.pos != data.len() {
            return Err(PayloadError::TrailingBytes(data.len() - r.pos));
        }
        Ok(Self { scene, isolated })
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn len(&mut self, len: usize) -> Result<(), PayloadError> {
        let len = u32::try_from(len).map_err(|_| PayloadError::TooLarge(len))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn f32s(&mut self, values: &[f32]) -> Result<(), PayloadError> {
        self.len(values.len())?;
        self.buf.reserve(values.len() * 4);
        for v in values {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    fn u32s(&mut self, values: &[u32]) -> Result<(), PayloadError> {
        self.len(values.len())?;
        self.buf.reserve(values.len() * 4);
        for v in values {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    fn object(&mut self, object: &ObjectLods) -> Result<(), PayloadError> {
        self.len(object.name.len())?;
        self.buf.extend_from_slice(object.name.as_bytes());
        self.buf.push(LOD_COUNT as u8);
        for lod in &object.lods {
            self.f32s(&lod.vertices)?;
            self.f32s(&lod.normals)?;
            self.u32s(&lod.indices)?;
        }
        Ok(())
    }

    fn geometry(&mut self, geometry: &IndexedGeometry) -> Result<(), PayloadError> {
        self.len(geometry.vertices.len())?;
        for v in geometry.vertices.iter().flatten() {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        self.len(geometry.faces.len())?;
        for face in &geometry.faces {
            self.u32s(face)?;
        }
        Ok(())
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], PayloadError> {
        let end = self.pos.checked_add(n).ok_or(PayloadError::Truncated {
            expected: usize::MAX,
            actual: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(PayloadError::Truncated {
                expected: end,
                actual: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, PayloadError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, PayloadError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads `count` 4-byte words. The whole span is bounds checked before
    /// anything is allocated, so a corrupt count cannot trigger a huge
    /// allocation.
    fn words(&mut self, count: usize) -> Result<impl Iterator<Item = [u8; 4]> + 'a, PayloadError> {
        let bytes = self.take(count.saturating_mul(4))?;
        Ok(bytes.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]))
    }

    fn f32s(&mut self) -> Result<Vec<f32>, PayloadError> {
        let count = self.u32()? as usize;
        Ok(self.words(count)?.map(f32::from_le_bytes).collect())
    }

    fn u32s(&mut self) -> Result<Vec<u32>, PayloadError> {
        let count = self.u32()? as usize;
        Ok(self.words(count)?.map(u32::from_le_bytes).collect())
    }

    fn buffers(&mut self) -> Result<PackedBuffers, PayloadError> {
        let vertices = self.f32s()?;
        let normals = self.f32s()?;
        let indices = self.u32s()?;

        if vertices.len() % 3 != 0 {
            return Err(PayloadError::MalformedBuffers("vertex array is not xyz triples"));
        }
        if normals.len() != vertices.len() {
            return Err(PayloadError::MalformedBuffers("normal and vertex arrays differ in length"));
        }
        if indices.len() % 3 != 0 {
            return Err(PayloadError::MalformedBuffers("index count is not a multiple of 3"));
        }
        check_indices(&indices, vertices.len() / 3)?;

        Ok(PackedBuffers {
            vertices,
            normals,
            indices,
        })
    }

    fn object(&mut self) -> Result<ObjectLods, PayloadError> {
        let name_len = self.u32()? as usize;
        let name = std::str::from_utf8(self.take(name_len)?)
            .map_err(|_| PayloadError::InvalidName)?
            .to_string();

        let lod_count = self.u8()?;
        if lod_count as usize != LOD_COUNT {
            return Err(PayloadError::InvalidLodCount(lod_count));
        }
        let mut lods: [PackedBuffers; LOD_COUNT] = Default::default();
        for lod in &mut lods {
            *lod = self.buffers()?;
        }
        Ok(ObjectLods { name, lods })
    }

    fn geometry(&mut self) -> Result<IndexedGeometry, PayloadError> {
        let vertex_count = self.u32()? as usize;
        let coords: Vec<f32> = self
            .words(vertex_count.saturating_mul(3))?
            .map(f32::from_le_bytes)
            .collect();
        let vertices = coords
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        let face_count = self.u32()? as usize;
        let mut faces = Vec::new();
        for _ in 0..face_count {
            let face = self.u32s()?;
            check_indices(&face, vertex_count)?;
            faces.push(face);
        }
        Ok(IndexedGeometry { vertices, faces })
    }
}

fn check_indices(indices: &[u32], vertex_count: usize) -> Result<(), PayloadError> {
    match indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(PayloadError::IndexOutOfRange {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_mesh::build_buffers;

    fn sample_geometry() -> IndexedGeometry {
        IndexedGeometry {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, -0.5],
            ],
            faces: vec![vec![0, 1, 2, 3]],
        }
    }

    fn sample_model() -> CachedModel {
        let geometry = sample_geometry();
        let full = build_buffers(&geometry);
        let lods = [full.clone(), full.clone(), full, PackedBuffers::new()];
        CachedModel {
            scene: vec![
                ObjectLods {
                    name: "Body".into(),
                    lods: lods.clone(),
                },
                ObjectLods {
                    name: "Wheel ünïcode".into(),
                    lods: Default::default(),
                },
            ],
            isolated: vec![IsolatedObject {
                buffers: ObjectLods {
                    name: "Body".into(),
                    lods,
                },
                geometry,
            }],
        }
    }

    #[test]
    fn test_encode_decode_preserves_model() {
        let model = sample_model();
        let bytes = model.encode().unwrap();
        assert_eq!(CachedModel::decode(&bytes).unwrap(), model);
    }

    #[test]
    fn test_empty_model() {
        let bytes = CachedModel::default().encode().unwrap();
        assert_eq!(bytes.len(), 4 + 1 + 4 + 4);
        assert_eq!(CachedModel::decode(&bytes).unwrap(), CachedModel::default());
    }

    #[test]
    fn test_version_byte_present() {
        let bytes = sample_model().encode().unwrap();
        assert_eq!(&bytes[0..4], b"STLC");
        assert_eq!(bytes[4], PAYLOAD_VERSION);
    }

    #[test]
    fn test_corrupted_data_returns_error() {
        assert!(matches!(
            CachedModel::decode(&[0xFF, 0xFF]),
            Err(PayloadError::InvalidMagic)
        ));

        let mut bytes = sample_model().encode().unwrap();
        bytes[4] = 99;
        assert!(matches!(
            CachedModel::decode(&bytes),
            Err(PayloadError::UnsupportedVersion(99))
        ));

        let bytes = sample_model().encode().unwrap();
        for cut in [5, 9, bytes.len() / 2, bytes.len() - 1] {
            let result = CachedModel::decode(&bytes[..cut]);
            assert!(
                matches!(result, Err(PayloadError::Truncated { .. })),
                "cut at {cut}: {result:?}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_model().encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            CachedModel::decode(&bytes),
            Err(PayloadError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut model = sample_model();
        model.scene[0].lods[0].indices[2] = 42;
        let bytes = model.encode().unwrap();
        assert!(matches!(
            CachedModel::decode(&bytes),
            Err(PayloadError::IndexOutOfRange { index: 42, .. })
        ));
    }

    #[test]
    fn test_mismatched_normals_rejected() {
        let mut model = sample_model();
        model.scene[0].lods[1].normals.truncate(3);
        let bytes = model.encode().unwrap();
        assert!(matches!(
            CachedModel::decode(&bytes),
            Err(PayloadError::MalformedBuffers(_))
        ));
    }

    #[test]
    fn test_wrong_lod_count_rejected() {
        let model = CachedModel {
            scene: vec![ObjectLods {
                name: "A".into(),
                lods: Default::default(),
            }],
            isolated: Vec::new(),
        };
        let mut bytes = model.encode().unwrap();
        // magic(4) + version(1) + count(4) + name len(4) + "A"(1) -> lod count byte
        assert_eq!(bytes[14], LOD_COUNT as u8);
        bytes[14] = 3;
        assert!(matches!(
            CachedModel::decode(&bytes),
            Err(PayloadError::InvalidLodCount(3))
        ));
    }

    #[test]
    fn test_lookup_helpers() {
        let model = sample_model();
        assert_eq!(model.object_count(), 2);
        assert!(model.scene_object("Body").is_some());
        assert!(model.scene_object("Missing").is_none());
        assert_eq!(
            model.isolated_object("Body").map(|o| o.geometry.face_count()),
            Some(1)
        );
    }
}
