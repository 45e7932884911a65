//! Face corner references.

use std::fmt;

/// One corner of a face: a required vertex index plus optional texture
/// coordinate and normal indices. All indices are zero-based and validated
/// against the owning model's arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceRef {
    /// Index into the vertex array.
    pub vertex: u32,
    /// Index into the texture coordinate array, if the corner has one.
    pub texcoord: Option<u32>,
    /// Index into the normal array, if the corner has one.
    pub normal: Option<u32>,
}

impl FaceRef {
    /// A corner with only a vertex reference.
    pub fn vertex(vertex: u32) -> Self {
        Self {
            vertex,
            texcoord: None,
            normal: None,
        }
    }
}

/// Writes the corner in the 1-based `v`, `v/t`, `v//n` or `v/t/n` form.
impl fmt::Display for FaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vertex + 1)?;
        match (self.texcoord, self.normal) {
            (None, None) => Ok(()),
            (Some(t), None) => write!(f, "/{}", t + 1),
            (None, Some(n)) => write!(f, "//{}", n + 1),
            (Some(t), Some(n)) => write!(f, "/{}/{}", t + 1, n + 1),
        }
    }
}

/// An ordered polygon of at least three corners.
pub type Face = Vec<FaceRef>;
