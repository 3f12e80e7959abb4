use crate::common::file_utils::{parse_raw_image_file_name, RAW_IMAGES_DIR};
use crate::config_loader::MasterConfig;
use crate::core::preset::{CaptureJob, Preset};
use crate::core::run_data::RunContext;
use crate::detection::http_detector::HttpDetectorFactory;
use crate::detection::DetectorFactory;
use crate::operations::op_helper;
use crate::pipeline::report::write_artifacts;
use crate::pipeline::runner::process_existing_jobs;
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub async fn handle_reprocess_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let run_dir = PathBuf::from(
        args.get_one::<String>("run-dir")
            .ok_or_else(|| anyhow!("--run-dir is required"))?,
    );
    let run = run_context_for_dir(&run_dir)?;
    let jobs = collect_raw_image_jobs(&run.raw_images_dir())?;
    if jobs.is_empty() {
        bail!("No raw images found in {}", run.raw_images_dir().display());
    }

    info!("🔁 Reprocessing {} image(s) from run {}", jobs.len(), run.run_id);
    let factory: Arc<dyn DetectorFactory> = Arc::new(HttpDetectorFactory::new(master_config.detector.clone()));
    let report = process_existing_jobs(jobs, factory, &run, &op_helper::pipeline_options(master_config)).await;
    write_artifacts(&report, &run)?;
    info!(
        "✅ Reprocessed run {} in {:?}: total count {}",
        run.run_id,
        op_start_time.elapsed(),
        report.total_count
    );
    Ok(())
}

/// Rebuilds the context of an earlier run from its `run_<id>` directory.
pub fn run_context_for_dir(run_dir: &Path) -> Result<RunContext> {
    if !run_dir.is_dir() {
        bail!("Run directory '{}' does not exist", run_dir.display());
    }
    let dir_name = run_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Run directory '{}' has no usable name", run_dir.display()))?;
    let run_id = dir_name.strip_prefix("run_").unwrap_or(dir_name);
    Ok(RunContext {
        run_id: run_id.to_string(),
        run_dir: run_dir.to_path_buf(),
    })
}

/// Jobs for every `preset_<number>_<name>.jpg` in `raw_dir`, by preset number.
pub fn collect_raw_image_jobs(raw_dir: &Path) -> Result<Vec<CaptureJob>> {
    let entries = std::fs::read_dir(raw_dir)
        .with_context(|| format!("Failed to read {} directory '{}'", RAW_IMAGES_DIR, raw_dir.display()))?;

    let mut jobs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_raw_image_file_name(file_name) {
            Some((number, name)) if Preset::is_valid_number(number) => {
                debug!("Found raw image for preset {} ({}): {}", number, name, path.display());
                jobs.push(CaptureJob::new(&Preset::new(number, name), path));
            }
            _ => warn!("⚠️ Skipping unrecognized file {}", path.display()),
        }
    }
    jobs.sort_by_key(|job| job.preset_number);
    Ok(jobs)
}
