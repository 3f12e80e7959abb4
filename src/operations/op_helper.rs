use crate::config_loader::MasterConfig;
use crate::core::preset::Preset;
use crate::pipeline::runner::PipelineOptions;
use crate::pipeline::dispatcher::pool_size;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Parses a comma-separated preset list such as `"1, 4,7"`.
pub fn parse_preset_numbers_arg(numbers_str_opt: Option<&String>) -> Result<Option<Vec<u16>>> {
    debug!("📝 Parsing preset numbers argument: {:?}", numbers_str_opt);
    let Some(numbers_str) = numbers_str_opt else {
        return Ok(None);
    };
    let mut numbers = Vec::new();
    for part in numbers_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let number = part
            .parse::<u16>()
            .with_context(|| format!("'{}' is not a preset number", part))?;
        numbers.push(number);
    }
    Ok(Some(numbers))
}

/// Configured presets, optionally narrowed to the `--presets` selection.
/// Numbers that are not configured are reported and skipped.
pub fn select_presets(master_config: &MasterConfig, args: &ArgMatches) -> Result<Vec<Preset>> {
    let configured = master_config.presets();
    let selection = match args.try_get_one::<String>("presets") {
        Ok(value) => parse_preset_numbers_arg(value)?,
        Err(_) => None,
    };
    let Some(numbers) = selection else {
        return Ok(configured);
    };

    let mut selected = Vec::new();
    for number in numbers {
        match configured.iter().find(|p| p.number == number) {
            Some(preset) => selected.push(preset.clone()),
            None => warn!("⚠️ Preset {} is not configured, skipping it.", number),
        }
    }
    if selected.is_empty() {
        bail!("None of the requested presets are configured.");
    }
    Ok(selected)
}

/// `--output` if given, otherwise the configured output directory (plus an optional subdir).
/// The directory is created if missing.
pub fn determine_operation_output_dir(
    master_config: &MasterConfig,
    args: &ArgMatches,
    output_cli_arg_key: &str,
    default_output_subdir: Option<&str>,
    operation_display_name: &str,
) -> Result<PathBuf> {
    let start_time = Instant::now();
    let cli_value = args.try_get_one::<String>(output_cli_arg_key).ok().flatten();
    let output_dir = match cli_value {
        Some(path_str) => {
            debug!("  Output directory specified via CLI for '{}': {}", operation_display_name, path_str);
            PathBuf::from(path_str)
        }
        None => {
            let mut dir = PathBuf::from(&master_config.app_settings.output_directory);
            if let Some(subdir) = default_output_subdir {
                dir.push(subdir);
            }
            dir
        }
    };

    if !output_dir.exists() {
        info!("📁 Output directory {} does not exist. Creating it for '{}'.", output_dir.display(), operation_display_name);
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!(
                "❌ Failed to create output directory '{}' for '{}'",
                output_dir.display(),
                operation_display_name
            )
        })?;
    }
    debug!("Determined output directory for '{}' in {:?}", operation_display_name, start_time.elapsed());
    Ok(output_dir)
}

pub fn pipeline_options(master_config: &MasterConfig) -> PipelineOptions {
    let configured = master_config.app_settings.num_workers;
    let num_workers = pool_size(configured);
    if num_workers < configured {
        info!("Using {} worker(s) (configured {}, limited by available parallelism)", num_workers, configured);
    }
    PipelineOptions {
        num_workers,
        jpeg_quality: master_config.app_settings.annotated_jpeg_quality,
    }
}
