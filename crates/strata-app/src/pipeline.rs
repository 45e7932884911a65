//! One-file preprocessing: parse, index, decimate, pack, cache.
//!
//! A cache hit bypasses every stage. On a miss the model is parsed and each
//! object is extracted, decimated into four levels and packed into buffers,
//! twice: once under a transform shared by the whole scene and once
//! normalised on its own. The result is saved only if the run completed.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use strata_cache::{CacheFetch, CachedModel, GeometryCache, IsolatedObject, ObjectLods};
use strata_lod::generate_lods;
use strata_mesh::{IndexedGeometry, Normalization, build_buffers};
use strata_obj::{ObjError, ParsedModel};

/// Shared flag for aborting a run between objects.
///
/// Clones observe the same flag, so a token can be handed to another thread
/// and cancelled from there.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), ProcessError> {
        if self.is_cancelled() {
            Err(ProcessError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Errors that abort processing of one file.
///
/// Cache failures never appear here; they degrade to reprocessing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The file could not be read or parsed.
    #[error(transparent)]
    Parse(#[from] ObjError),
    /// The run was cancelled before it completed.
    #[error("processing cancelled")]
    Cancelled,
}

/// Where a [`ProcessedModel`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelSource {
    /// Loaded from the geometry cache.
    FromCache,
    /// Built from the source file.
    Processed,
}

/// Output of [`ModelProcessor::process`].
#[derive(Clone, Debug)]
pub struct ProcessedModel {
    /// Per-object LOD buffers.
    pub model: CachedModel,
    /// Whether the cache supplied the model.
    pub source: ModelSource,
    /// Wall time of the call.
    pub elapsed: Duration,
}

/// Drives the preprocessing stages for single files.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModelProcessor;

impl ModelProcessor {
    /// Creates a processor.
    pub fn new() -> Self {
        Self
    }

    /// Produces the LOD buffers for `path`, consulting and filling `cache`
    /// when one is given.
    ///
    /// `cancel` is polled between objects. A cancelled run returns
    /// [`ProcessError::Cancelled`] and leaves the cache untouched.
    pub fn process(
        &self,
        path: &Path,
        mut cache: Option<&mut GeometryCache>,
        cancel: &CancelToken,
    ) -> Result<ProcessedModel, ProcessError> {
        let start = Instant::now();

        let pending = match cache.as_deref_mut().map(|cache| cache.fetch(path)) {
            Some(CacheFetch::Hit(model)) => {
                return Ok(ProcessedModel {
                    model,
                    source: ModelSource::FromCache,
                    elapsed: start.elapsed(),
                });
            }
            Some(CacheFetch::Miss(pending)) => Some(pending),
            Some(CacheFetch::Unavailable) | None => None,
        };

        let parsed = ParsedModel::parse_file(path)?;
        let model = self.build(&parsed, cancel)?;
        cancel.check()?;
        let elapsed = start.elapsed();

        tracing::info!(
            path = %path.display(),
            objects = model.object_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "processed model"
        );

        if let (Some(cache), Some(pending)) = (cache, pending)
            && let Err(e) = cache.store(pending, &model, elapsed)
        {
            tracing::warn!(path = %path.display(), error = %e, "could not cache model");
        }

        Ok(ProcessedModel {
            model,
            source: ModelSource::Processed,
            elapsed,
        })
    }

    /// Builds both renditions of every object of `parsed`.
    ///
    /// Objects whose geometry is empty after indexing are skipped.
    pub fn build(
        &self,
        parsed: &ParsedModel,
        cancel: &CancelToken,
    ) -> Result<CachedModel, ProcessError> {
        self.build_with(parsed, cancel, |_| {})
    }

    /// Like [`build`](Self::build), calling `on_object` with the scene
    /// buffers of each object as soon as it is finished.
    pub fn build_with(
        &self,
        parsed: &ParsedModel,
        cancel: &CancelToken,
        mut on_object: impl FnMut(&ObjectLods),
    ) -> Result<CachedModel, ProcessError> {
        let mut objects: Vec<(&str, IndexedGeometry)> = Vec::new();
        for name in parsed.object_names() {
            cancel.check()?;
            let geometry = parsed.object_geometry(name);
            if geometry.is_empty() {
                tracing::debug!(object = name, "skipping object without drawable faces");
                continue;
            }
            objects.push((name, geometry));
        }

        let vertex_sets: Vec<&[[f32; 3]]> =
            objects.iter().map(|(_, g)| g.vertices.as_slice()).collect();
        let scene_fit = Normalization::fit_many(&vertex_sets);

        let mut model = CachedModel {
            scene: Vec::with_capacity(objects.len()),
            isolated: Vec::with_capacity(objects.len()),
        };
        for (name, geometry) in &objects {
            cancel.check()?;

            let mut in_scene = geometry.clone();
            scene_fit.apply(&mut in_scene);
            let lods = object_lods(name, &in_scene);
            on_object(&lods);
            model.scene.push(lods);

            let mut alone = geometry.clone();
            Normalization::fit(&alone.vertices).apply(&mut alone);
            model.isolated.push(IsolatedObject {
                buffers: object_lods(name, &alone),
                geometry: alone,
            });

            tracing::debug!(
                object = name,
                faces = geometry.face_count(),
                vertices = geometry.vertex_count(),
                "processed object"
            );
        }
        Ok(model)
    }
}

fn object_lods(name: &str, geometry: &IndexedGeometry) -> ObjectLods {
    let lods = generate_lods(geometry);
    ObjectLods {
        name: name.to_string(),
        lods: lods.levels().each_ref().map(build_buffers),
    }
}
