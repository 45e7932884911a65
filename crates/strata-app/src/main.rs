//! The `strata` command-line tool.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use strata_app::{CancelToken, ModelProcessor, ModelSource, PlatformDirs};
use strata_cache::GeometryCache;
use strata_config::{CacheCommand, CliArgs, Command, Config};
use strata_obj::ParsedModel;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve() {
        Ok(dirs) => dirs.with_config_dir(args.config.clone()),
        Err(e) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create application directories: {e}");
    }

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    strata_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    let mut cache = open_cache(&dirs, &config);
    let outcome = match &args.command {
        Command::Process { files } => process(files, cache.as_mut()),
        Command::Inspect { file } => inspect(file),
        Command::Cache { action } => match cache.as_mut() {
            Some(cache) => cache_command(action, cache, &config),
            None => {
                eprintln!("The geometry cache is disabled");
                false
            }
        },
    };

    if outcome {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Opens the configured cache, or returns `None` when it is disabled or
/// unusable. A broken cache only costs speed, so it never stops the run.
fn open_cache(dirs: &PlatformDirs, config: &Config) -> Option<GeometryCache> {
    if !config.cache.enabled {
        tracing::info!("geometry cache disabled");
        return None;
    }

    let dir = dirs.cache_dir_for(&config.cache);
    let mut cache = match GeometryCache::open(&dir) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "could not open geometry cache");
            return None;
        }
    };
    if config.cache.cleanup_on_start {
        cache.cleanup(config.cache.max_age_days, config.cache.max_size_mb);
    }
    Some(cache)
}

fn process(files: &[std::path::PathBuf], mut cache: Option<&mut GeometryCache>) -> bool {
    let processor = ModelProcessor::new();
    let cancel = CancelToken::new();
    let mut all_ok = true;

    for file in files {
        match processor.process(file, cache.as_deref_mut(), &cancel) {
            Ok(processed) => {
                let source = match processed.source {
                    ModelSource::FromCache => "cache",
                    ModelSource::Processed => "processed",
                };
                println!(
                    "{} ({source}, {:.2}s)",
                    file.display(),
                    processed.elapsed.as_secs_f64()
                );
                for object in &processed.model.scene {
                    let triangles: Vec<String> = object
                        .lods
                        .iter()
                        .map(|lod| lod.triangle_count().to_string())
                        .collect();
                    println!("  {:<32} triangles per LOD: {}", object.name, triangles.join(" / "));
                }
            }
            Err(e) => {
                eprintln!("{}: {e}", file.display());
                all_ok = false;
            }
        }
    }
    all_ok
}

fn inspect(file: &Path) -> bool {
    let model = match ParsedModel::parse_file(file) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{e}");
            return false;
        }
    };

    let stats = model.statistics();
    println!("{}", file.display());
    println!("  vertices:  {}", stats.vertices);
    println!("  faces:     {}", stats.faces);
    println!("  objects:   {}", stats.objects);
    println!("  normals:   {}", stats.normals);
    println!("  texcoords: {}", stats.texcoords);
    println!("  materials: {}", stats.materials);
    for summary in model.object_summaries() {
        println!(
            "  {:<32} {:>8} faces {:>8} vertices",
            summary.name, summary.faces, summary.vertices
        );
    }
    true
}

fn cache_command(action: &CacheCommand, cache: &mut GeometryCache, config: &Config) -> bool {
    match action {
        CacheCommand::Stats => {
            let stats = cache.stats();
            println!("cache directory: {}", stats.cache_dir.display());
            println!("indexed files:   {}", stats.total_files);
            println!("total size:      {:.2} MB", stats.total_size_mb);
            true
        }
        CacheCommand::Clear { file } => match cache.clear(file.as_deref()) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Failed to clear cache: {e}");
                false
            }
        },
        CacheCommand::Cleanup {
            max_age_days,
            max_size_mb,
        } => {
            let removed = cache.cleanup(
                max_age_days.unwrap_or(config.cache.max_age_days),
                max_size_mb.unwrap_or(config.cache.max_size_mb),
            );
            println!("removed {removed} cache entries");
            true
        }
    }
}
