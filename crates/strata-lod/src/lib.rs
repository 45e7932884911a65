//! Level-of-detail generation: a fixed four-level ladder of decimated
//! geometries per object.

mod decimate;

pub use decimate::{LOD_COUNT, LOD_REDUCTION_FACTORS, LodSet, decimate, generate_lods};
