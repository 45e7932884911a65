//! Line-oriented text model parsing and per-object extraction.
//!
//! [`ParsedModel`] owns the global vertex, normal and texture coordinate
//! arrays plus the named objects that partition the face list. Object
//! geometry is extracted into dense, self-contained
//! [`IndexedGeometry`](strata_mesh::IndexedGeometry) values for LOD
//! generation and buffer building.

mod error;
pub mod face;
pub mod indexer;
pub mod model;
mod parser;

pub use error::ObjError;
pub use face::{Face, FaceRef};
pub use indexer::{ObjectSummary, SplitObject};
pub use model::{DEFAULT_OBJECT_NAME, ModelStatistics, NamedObject, ParsedModel};
