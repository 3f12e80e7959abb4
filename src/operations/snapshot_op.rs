use crate::camera::camera_entity::CameraEntity;
use crate::camera::image_capturer::ImageCapturer;
use crate::config_loader::MasterConfig;
use crate::operations::op_helper;
use crate::pipeline::orchestrator::capture_all;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use log::{info, warn};
use std::time::Instant;

pub async fn handle_snapshot_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let operation_display_name = "Snapshot";
    let presets = op_helper::select_presets(master_config, args)?;
    let output_dir = op_helper::determine_operation_output_dir(
        master_config,
        args,
        "output",
        Some("snapshots"),
        operation_display_name,
    )?;

    let camera = CameraEntity::new(master_config.camera.clone());
    let capturer = ImageCapturer::new(&camera).context("Failed to set up the image capturer")?;
    info!("📸 Capturing {} preset(s) to {}", presets.len(), output_dir.display());

    let outcome = capture_all(&capturer, &presets, &output_dir).await;
    for job in &outcome.jobs {
        info!("  -> {}", job.image_path.display());
    }
    if outcome.jobs.is_empty() {
        bail!("No snapshot could be captured ({} preset(s) failed)", outcome.failed_presets.len());
    }
    if !outcome.failed_presets.is_empty() {
        warn!("⚠️ Failed presets: {:?}", outcome.failed_presets);
    }
    info!("✅ Captured {} snapshot(s) in {:?}", outcome.jobs.len(), op_start_time.elapsed());
    Ok(())
}
