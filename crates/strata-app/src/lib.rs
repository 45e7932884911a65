//! Strata model preprocessing application.
//!
//! Wires the parser, object indexer, LOD generator and buffer builder into
//! one pipeline fronted by the geometry cache, and resolves the platform
//! directories the `strata` binary works in.

pub mod pipeline;
pub mod platform;

pub use pipeline::{CancelToken, ModelProcessor, ModelSource, ProcessError, ProcessedModel};
pub use platform::{PlatformDirs, PlatformError};

#[cfg(test)]
mod tests;
