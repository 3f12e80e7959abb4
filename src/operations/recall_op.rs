use crate::camera::camera_entity::CameraEntity;
use crate::camera::visca::ViscaController;
use crate::config_loader::MasterConfig;
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use log::{error, info};
use std::time::Instant;

pub async fn handle_recall_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let preset_number = *args
        .get_one::<u16>("preset")
        .ok_or_else(|| anyhow!("--preset is required"))?;

    let camera = CameraEntity::new(master_config.camera.clone());
    let controller = ViscaController::from_camera(&camera);
    info!("🎯 Recalling preset {} on '{}' ({})", preset_number, camera.config.name, controller.address());

    match controller.recall_preset(preset_number).await {
        Ok(()) => {
            info!("✅ Preset {} recalled in {:?}", preset_number, op_start_time.elapsed());
            Ok(())
        }
        Err(e) => {
            error!("❌ Recall of preset {} failed after {:?}: {}", preset_number, op_start_time.elapsed(), e);
            Err(e.into())
        }
    }
}
