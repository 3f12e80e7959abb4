use crate::camera::camera_entity::CameraEntity;
use crate::camera::image_capturer::ImageCapturer;
use crate::common::timestamp_utils::new_run_id;
use crate::config_loader::MasterConfig;
use crate::core::capture_source::CaptureSource;
use crate::core::preset::Preset;
use crate::core::run_data::{RunContext, RunReport};
use crate::detection::http_detector::HttpDetectorFactory;
use crate::detection::DetectorFactory;
use crate::operations::op_helper;
use crate::pipeline::report::{write_artifacts, ReportArtifacts};
use crate::pipeline::runner::{run_counting_pipeline, PipelineOptions};
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub async fn handle_count_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let operation_display_name = "Crowd Count";
    let presets = op_helper::select_presets(master_config, args)?;
    let output_base = op_helper::determine_operation_output_dir(master_config, args, "output", None, operation_display_name)?;

    let camera = CameraEntity::new(master_config.camera.clone());
    let capturer = ImageCapturer::new(&camera).context("Failed to set up the image capturer")?;
    let factory: Arc<dyn DetectorFactory> = Arc::new(HttpDetectorFactory::new(master_config.detector.clone()));
    let run = RunContext::new(new_run_id(&master_config.app_settings.run_id_format), &output_base);

    let (report, _artifacts) = execute_count_run(
        &capturer,
        &presets,
        factory,
        &run,
        &op_helper::pipeline_options(master_config),
        master_config.app_settings.keep_raw_images,
    )
    .await?;

    if !report.failed_presets.is_empty() {
        warn!("⚠️ Presets with no count this run: {:?}", report.failed_presets);
    }
    for result in report.per_preset.iter().filter(|r| r.is_error()) {
        warn!(
            "⚠️ Preset {} ({}) failed processing: {}",
            result.preset_number,
            result.preset_name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    info!("👥 Total count for run {}: {}", report.run_id, report.total_count);
    Ok(())
}

/// One complete counting run with artifacts written under `run.run_dir`.
pub async fn execute_count_run<C>(
    source: &C,
    presets: &[Preset],
    factory: Arc<dyn DetectorFactory>,
    run: &RunContext,
    options: &PipelineOptions,
    keep_raw_images: bool,
) -> Result<(RunReport, ReportArtifacts)>
where
    C: CaptureSource + ?Sized,
{
    let op_start_time = Instant::now();
    info!(
        "🚀 Starting run {} over {} preset(s) in {}",
        run.run_id,
        presets.len(),
        run.run_dir.display()
    );
    std::fs::create_dir_all(&run.run_dir)
        .with_context(|| format!("❌ Failed to create run directory '{}'", run.run_dir.display()))?;

    let report = run_counting_pipeline(source, presets, factory, run, options).await;
    let artifacts = write_artifacts(&report, run)?;

    if !keep_raw_images {
        remove_raw_images(&run.raw_images_dir());
    }
    info!("✅ Run {} finished in {:?}", run.run_id, op_start_time.elapsed());
    Ok((report, artifacts))
}

fn remove_raw_images(raw_dir: &Path) {
    if !raw_dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(raw_dir) {
        Ok(()) => debug!("🧹 Removed raw images at {}", raw_dir.display()),
        Err(e) => error!("Failed to remove raw images at {}: {}", raw_dir.display(), e),
    }
}
