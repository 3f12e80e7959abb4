use anyhow::{bail, Result};
use log::{debug, error, info};
use ptzcount::cli;
use ptzcount::common::logging_setup;
use ptzcount::config_loader;
use ptzcount::operations;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let main_start_time = Instant::now();
    let matches = cli::build_cli().get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/ptzcount.yaml");

    let config_load_start_time = Instant::now();
    let master_config = match config_loader::load_config(config_path) {
        Ok(cfg) => {
            logging_setup::initialize_logging(Some(&cfg), &matches);
            info!("✅ Configuration loaded from: {} in {:?}", config_path, config_load_start_time.elapsed());
            cfg
        }
        Err(e) => {
            logging_setup::initialize_logging(None, &matches);
            error!("❌ Failed to load configuration from '{}': {:#}. Exiting.", config_path, e);
            return Err(e.context(format!("Failed to load configuration from '{}'", config_path)));
        }
    };

    info!(
        "🚀 PTZCount starting for camera '{}' with {} preset(s) configured.",
        master_config.camera.name,
        master_config.presets.len()
    );

    let Some((operation_name, sub_matches)) = matches.subcommand() else {
        info!("🤔 No subcommand provided. Try `ptzcount count` or `ptzcount --help`.");
        return Ok(());
    };

    debug!("🎬 Dispatching to subcommand: {}", operation_name);
    let op_start_time = Instant::now();
    let op_result: Result<()> = match operation_name {
        "count" => operations::count_op::handle_count_cli(&master_config, sub_matches).await,
        "recall" => operations::recall_op::handle_recall_cli(&master_config, sub_matches).await,
        "snapshot" => operations::snapshot_op::handle_snapshot_cli(&master_config, sub_matches).await,
        "reprocess" => operations::reprocess_op::handle_reprocess_cli(&master_config, sub_matches).await,
        other => bail!("Subcommand '{}' not implemented.", other),
    };

    if let Err(e) = op_result {
        error!("❌ Operation '{}' failed after {:?}: {:#}", operation_name, op_start_time.elapsed(), e);
        return Err(e);
    }
    info!("✅ Operation '{}' completed successfully in {:?}.", operation_name, op_start_time.elapsed());
    info!("🏁 PTZCount finished in {:?}.", main_start_time.elapsed());
    Ok(())
}
