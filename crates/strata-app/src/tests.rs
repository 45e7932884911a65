//! End-to-end tests of the preprocessing pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use strata_cache::{BLOB_EXTENSION, GeometryCache, content_hash};
use strata_lod::LOD_COUNT;
use strata_obj::ParsedModel;

use crate::{CancelToken, ModelProcessor, ModelSource, ProcessError};

const CUBE: &str = "\
o Cube
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 1 4 3 2
f 5 6 7 8
f 1 2 6 5
f 3 4 8 7
f 2 3 7 6
f 1 5 8 4
";

/// Two separated triangles; `Far` sits ten units away and is twice as big.
const TWO_PARTS: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 10 0 0
v 12 0 0
v 10 2 0
o Near
f 1 2 3
o Far
f 4 5 6
";

const THREE_PARTS: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
o First
f 1 2 3
o Second
f 1 3 2
o Third
f 2 1 3
";

struct Workspace {
    dir: tempfile::TempDir,
    cache: GeometryCache,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeometryCache::open(dir.path().join("cache")).unwrap();
        Self { dir, cache }
    }

    fn model(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn blob_count(&self) -> usize {
        fs::read_dir(self.cache.dir())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == BLOB_EXTENSION))
            .count()
    }
}

fn max_abs_coordinate(vertices: &[f32]) -> f32 {
    vertices.iter().fold(0.0_f32, |m, v| m.max(v.abs()))
}

#[test]
fn test_cube_scenario() {
    let parsed = ParsedModel::parse_str(CUBE).unwrap();
    let stats = parsed.statistics();
    assert_eq!((stats.vertices, stats.faces, stats.objects), (8, 6, 1));

    let model = ModelProcessor::new()
        .build(&parsed, &CancelToken::new())
        .unwrap();
    assert_eq!(model.object_count(), 1);

    let cube = model.scene_object("Cube").unwrap();
    let index_counts: Vec<usize> = cube.lods.iter().map(|b| b.index_count()).collect();
    // 6 quads, then faces 0,2,4, then one face twice.
    assert_eq!(index_counts, vec![36, 18, 6, 6]);
    assert_eq!(cube.lods[0].vertex_count(), 8);
}

#[test]
fn test_every_object_has_all_levels() {
    let parsed = ParsedModel::parse_str(TWO_PARTS).unwrap();
    let model = ModelProcessor::new()
        .build(&parsed, &CancelToken::new())
        .unwrap();

    let names: Vec<&str> = model.scene.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Near", "Far"]);
    assert_eq!(model.isolated.len(), 2);
    for object in &model.scene {
        assert_eq!(object.lods.len(), LOD_COUNT);
        for lod in &object.lods {
            assert_eq!(lod.index_count(), 3);
            assert_eq!(lod.normals.len(), lod.vertices.len());
        }
    }
}

#[test]
fn test_scene_shares_one_transform_and_isolated_fills_the_cube() {
    let parsed = ParsedModel::parse_str(TWO_PARTS).unwrap();
    let model = ModelProcessor::new()
        .build(&parsed, &CancelToken::new())
        .unwrap();

    // Scene-wide: only the vertex farthest from the shared centre reaches 2.
    let scene_extent = model
        .scene
        .iter()
        .map(|o| max_abs_coordinate(&o.lods[0].vertices))
        .fold(0.0_f32, f32::max);
    assert!((scene_extent - 2.0).abs() < 1e-5);
    let near = max_abs_coordinate(&model.scene_object("Near").unwrap().lods[0].vertices);
    assert!(near < 2.0 - 1e-3);

    // Isolated: each object is scaled by its own extent.
    for object in &model.isolated {
        let extent = max_abs_coordinate(&object.buffers.lods[0].vertices);
        assert!((extent - 2.0).abs() < 1e-5, "{}", object.buffers.name);
        let flat: Vec<f32> = object.geometry.vertices.iter().flatten().copied().collect();
        assert_eq!(flat, object.buffers.lods[0].vertices);
    }
}

#[test]
fn test_second_run_is_served_from_cache() {
    let mut ws = Workspace::new();
    let path = ws.model("cube.obj", CUBE);
    let processor = ModelProcessor::new();
    let cancel = CancelToken::new();

    let first = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    assert_eq!(first.source, ModelSource::Processed);
    assert!(ws.cache.is_cached(&path));

    let second = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    assert_eq!(second.source, ModelSource::FromCache);
    assert_eq!(second.model, first.model);
    assert_eq!(ws.blob_count(), 1);
}

#[test]
fn test_copied_file_reuses_payload() {
    let mut ws = Workspace::new();
    let original = ws.model("cube.obj", CUBE);
    let copy = ws.model("cube copy.obj", CUBE);
    let processor = ModelProcessor::new();
    let cancel = CancelToken::new();

    processor.process(&original, Some(&mut ws.cache), &cancel).unwrap();
    let copied = processor.process(&copy, Some(&mut ws.cache), &cancel).unwrap();

    assert_eq!(copied.source, ModelSource::FromCache);
    assert_eq!(ws.blob_count(), 1);
    assert_eq!(ws.cache.stats().total_files, 2);
}

#[test]
fn test_modified_file_is_reprocessed() {
    let mut ws = Workspace::new();
    let path = ws.model("parts.obj", TWO_PARTS);
    let processor = ModelProcessor::new();
    let cancel = CancelToken::new();

    processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    fs::write(&path, CUBE).unwrap();

    let rerun = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    assert_eq!(rerun.source, ModelSource::Processed);
    assert!(rerun.model.scene_object("Cube").is_some());
    assert_eq!(ws.cache.index().len(), 1);
    assert_eq!(ws.blob_count(), 1);

    assert_eq!(ws.cache.cleanup(0.0, 0.0), 1);
    assert_eq!(ws.blob_count(), 0);
}

#[test]
fn test_unreadable_blob_is_rebuilt_and_served_again() {
    let mut ws = Workspace::new();
    let path = ws.model("cube.obj", CUBE);
    let processor = ModelProcessor::new();
    let cancel = CancelToken::new();

    let first = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    let hash = content_hash(&path).unwrap();
    fs::write(ws.cache.blob_path(&hash), b"STLC\x02old-format").unwrap();

    let rebuilt = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    assert_eq!(rebuilt.source, ModelSource::Processed);
    let served = processor.process(&path, Some(&mut ws.cache), &cancel).unwrap();
    assert_eq!(served.source, ModelSource::FromCache);
    assert_eq!(served.model, first.model);
    assert_eq!(ws.blob_count(), 1);
}

#[test]
fn test_cancelled_run_writes_nothing() {
    let mut ws = Workspace::new();
    let path = ws.model("cube.obj", CUBE);
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = ModelProcessor::new().process(&path, Some(&mut ws.cache), &cancel);
    assert!(matches!(result, Err(ProcessError::Cancelled)));
    assert!(ws.cache.index().is_empty());
    assert_eq!(ws.blob_count(), 0);
}

#[test]
fn test_cancel_between_objects_stops_the_build() {
    let parsed = ParsedModel::parse_str(THREE_PARTS).unwrap();
    let cancel = CancelToken::new();
    let mut finished = Vec::new();

    let result = ModelProcessor::new().build_with(&parsed, &cancel, |object| {
        finished.push(object.name.clone());
        cancel.cancel();
    });

    assert!(matches!(result, Err(ProcessError::Cancelled)));
    assert_eq!(finished, vec!["First".to_string()]);
}

#[test]
fn test_build_reports_every_object_in_order() {
    let parsed = ParsedModel::parse_str(THREE_PARTS).unwrap();
    let mut finished = Vec::new();

    let model = ModelProcessor::new()
        .build_with(&parsed, &CancelToken::new(), |object| {
            finished.push(object.name.clone())
        })
        .unwrap();

    assert_eq!(finished, vec!["First", "Second", "Third"]);
    assert_eq!(model.object_count(), 3);
}

#[test]
fn test_parse_failure_is_reported_and_not_cached() {
    let mut ws = Workspace::new();
    let path = ws.model("broken.obj", "v 0 0 zero\nf 1 1 1\n");

    let result = ModelProcessor::new().process(&path, Some(&mut ws.cache), &CancelToken::new());
    assert!(matches!(result, Err(ProcessError::Parse(_))));
    assert_eq!(ws.blob_count(), 0);
}

#[test]
fn test_missing_file_is_read_error() {
    let mut ws = Workspace::new();
    let missing = ws.dir.path().join("missing.obj");
    let result = ModelProcessor::new().process(&missing, Some(&mut ws.cache), &CancelToken::new());
    assert!(matches!(result, Err(ProcessError::Parse(_))));
}

#[test]
fn test_processing_without_cache() {
    let ws = Workspace::new();
    let path = ws.model("cube.obj", CUBE);
    let processed = ModelProcessor::new()
        .process(&path, None, &CancelToken::new())
        .unwrap();
    assert_eq!(processed.source, ModelSource::Processed);
    assert_eq!(processed.model.scene[0].lods[0].index_count(), 36);
}

#[test]
fn test_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cube.obj");
    fs::write(&path, CUBE).unwrap();
    let cache_dir: &Path = &dir.path().join("cache");
    let cancel = CancelToken::new();

    let first = {
        let mut cache = GeometryCache::open(cache_dir).unwrap();
        ModelProcessor::new()
            .process(&path, Some(&mut cache), &cancel)
            .unwrap()
    };

    let mut cache = GeometryCache::open(cache_dir).unwrap();
    let second = ModelProcessor::new()
        .process(&path, Some(&mut cache), &cancel)
        .unwrap();
    assert_eq!(second.source, ModelSource::FromCache);
    assert_eq!(second.model, first.model);
}
