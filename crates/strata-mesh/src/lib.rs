//! Geometry containers, dense reindexing, display normalisation and
//! flat-buffer packing for render-ready meshes.

pub mod buffers;
pub mod geometry;
pub mod normalize;

pub use buffers::{DEFAULT_NORMAL, PackedBuffers, build_buffers};
pub use geometry::{IndexedGeometry, reindex};
pub use normalize::Normalization;
