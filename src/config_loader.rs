use crate::app_config::{ApplicationConfig, DetectorConfig};
use crate::camera_config::{CameraConfig, PresetConfig, MAX_CAMERA_DELAY_SECS};
use crate::core::preset::Preset;
use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::time::Instant;

#[derive(Debug, Deserialize, Clone)]
pub struct MasterConfig {
    #[serde(rename = "application", default)]
    pub app_settings: ApplicationConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    pub presets: Vec<PresetConfig>,
}

impl MasterConfig {
    /// Presets in configuration order, with missing names filled in.
    pub fn presets(&self) -> Vec<Preset> {
        self.presets
            .iter()
            .map(|p| {
                let name = p
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Preset {}", p.number));
                Preset::new(p.number, name)
            })
            .collect()
    }
}

pub fn load_config(path: &str) -> Result<MasterConfig> {
    debug!("📄 Attempting to load config from: {}", path);
    let start_time = Instant::now();

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'. 📖", path))?;
    debug!("Read config file in {:?}", start_time.elapsed());

    let config = parse_config(&config_str)
        .with_context(|| format!("Invalid configuration in '{}' 💔", path))?;

    info!("✅ Successfully loaded and validated configuration from '{}' in {:?}", path, start_time.elapsed());
    Ok(config)
}

pub fn parse_config(yaml: &str) -> Result<MasterConfig> {
    let config: MasterConfig = serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
    validate_master_config(&config).context("Master configuration validation failed 👎")?;
    Ok(config)
}

fn validate_master_config(config: &MasterConfig) -> Result<()> {
    debug!("🕵️ Validating master configuration...");
    let app = &config.app_settings;
    if app.output_directory.is_empty() {
        bail!("❌ Application output_directory cannot be empty.");
    }
    if app.run_id_format.is_empty() {
        bail!("❌ Application run_id_format cannot be empty.");
    }
    if StrftimeItems::new(&app.run_id_format).any(|item| matches!(item, Item::Error)) {
        bail!("❌ run_id_format '{}' is not a valid strftime pattern.", app.run_id_format);
    }
    if app.run_id_format.contains(['/', '\\']) {
        bail!("❌ run_id_format '{}' cannot contain path separators.", app.run_id_format);
    }
    if app.num_workers == 0 {
        bail!("❌ Application num_workers must be at least 1.");
    }
    if app.annotated_jpeg_quality == 0 || app.annotated_jpeg_quality > 100 {
        bail!("❌ annotated_jpeg_quality must be within 1..=100, got {}.", app.annotated_jpeg_quality);
    }

    let camera = &config.camera;
    if camera.name.is_empty() {
        bail!("❌ Camera name cannot be empty.");
    }
    if camera.ip.parse::<IpAddr>().is_err() {
        bail!("❌ Invalid IP address format '{}' for camera '{}'.", camera.ip, camera.name);
    }
    if camera.username.is_empty() {
        bail!("❌ Username for camera '{}' cannot be empty.", camera.name);
    }
    let timeout = camera.command_timeout_secs;
    if !(timeout.is_finite() && timeout > 0.0 && timeout <= MAX_CAMERA_DELAY_SECS) {
        bail!(
            "❌ command_timeout_secs for camera '{}' must be within (0, {}], got {}.",
            camera.name,
            MAX_CAMERA_DELAY_SECS,
            timeout
        );
    }
    for (field, value) in [
        ("command_retry_delay_secs", camera.command_retry_delay_secs),
        ("settle_delay_secs", camera.settle_delay_secs),
    ] {
        if !(value.is_finite() && (0.0..=MAX_CAMERA_DELAY_SECS).contains(&value)) {
            bail!(
                "❌ {} for camera '{}' must be within [0, {}], got {}.",
                field,
                camera.name,
                MAX_CAMERA_DELAY_SECS,
                value
            );
        }
    }

    let detector = &config.detector;
    if detector.endpoint.is_empty() {
        bail!("❌ Detector endpoint cannot be empty.");
    }
    if !(detector.cluster_eps.is_finite() && detector.cluster_eps > 0.0) {
        bail!("❌ Detector cluster_eps must be a positive number, got {}.", detector.cluster_eps);
    }
    for (field, value) in [("confidence", detector.confidence), ("iou", detector.iou)] {
        if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
            bail!("❌ Detector {} must be within [0, 1], got {}.", field, value);
        }
    }
    if detector.min_cluster_size == 0 {
        bail!("❌ Detector min_cluster_size must be at least 1.");
    }

    if config.presets.is_empty() {
        bail!("❌ No presets defined in the configuration.");
    }
    let mut numbers = HashSet::new();
    for (idx, preset) in config.presets.iter().enumerate() {
        if !Preset::is_valid_number(preset.number) {
            bail!("❌ Preset #{} has number {} outside 1..=256.", idx + 1, preset.number);
        }
        if !numbers.insert(preset.number) {
            bail!("❌ Duplicate preset number found: {}", preset.number);
        }
        if matches!(&preset.name, Some(name) if name.trim().is_empty()) {
            bail!("❌ Preset {} has an empty name.", preset.number);
        }
    }
    info!("👍 Master configuration validated: {} preset(s).", config.presets.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
application:
  output_directory: ./output
  num_workers: 2
camera:
  name: ptz-main
  ip: 192.168.0.100
  username: admin
presets:
  - number: 1
    name: Balcony
  - number: 2
"#;

    #[test]
    fn parses_valid_config_with_defaults() {
        let cfg = parse_config(VALID).unwrap();
        assert_eq!(cfg.app_settings.num_workers, 2);
        assert_eq!(cfg.app_settings.annotated_jpeg_quality, 70);
        assert_eq!(cfg.camera.visca_port, 5678);
        assert_eq!(cfg.camera.command_timeout_secs, 15.0);
        assert_eq!(cfg.detector.min_cluster_size, 2);
        assert_eq!(
            cfg.presets(),
            vec![Preset::new(1, "Balcony"), Preset::new(2, "Preset 2")]
        );
    }

    #[test]
    fn rejects_out_of_range_preset() {
        let yaml = VALID.replace("number: 2", "number: 257");
        let err = parse_config(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("outside 1..=256"));
    }

    #[test]
    fn rejects_duplicate_preset_numbers() {
        let yaml = VALID.replace("number: 2", "number: 1");
        let err = parse_config(&yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate preset number"));
    }

    #[test]
    fn rejects_empty_presets_and_bad_ip() {
        let no_presets = r#"
camera:
  name: ptz-main
  ip: 192.168.0.100
  username: admin
presets: []
"#;
        assert!(parse_config(no_presets).is_err());

        let bad_ip = VALID.replace("192.168.0.100", "camera.local");
        assert!(parse_config(&bad_ip).is_err());
    }

    fn with_camera_field(field: &str, value: &str) -> String {
        VALID.replace("  username: admin", &format!("  username: admin\n  {}: {}", field, value))
    }

    #[test]
    fn rejects_non_finite_durations() {
        for value in [".nan", ".inf", "-.inf", "100000", "0", "-1"] {
            let yaml = with_camera_field("command_timeout_secs", value);
            let err = parse_config(&yaml).unwrap_err();
            assert!(format!("{:#}", err).contains("command_timeout_secs"), "value {}", value);
        }
        for field in ["command_retry_delay_secs", "settle_delay_secs"] {
            for value in [".nan", ".inf", "-0.5", "100000"] {
                let err = parse_config(&with_camera_field(field, value)).unwrap_err();
                assert!(format!("{:#}", err).contains(field), "{} = {}", field, value);
            }
            assert!(parse_config(&with_camera_field(field, "0")).is_ok());
        }
    }

    #[test]
    fn rejects_non_finite_detector_settings() {
        for (field, value) in [
            ("cluster_eps", ".nan"),
            ("cluster_eps", ".inf"),
            ("confidence", ".nan"),
            ("confidence", "1.5"),
            ("iou", "-.inf"),
        ] {
            let yaml = format!("{}detector:\n  {}: {}\n", VALID, field, value);
            let err = parse_config(&yaml).unwrap_err();
            assert!(format!("{:#}", err).contains(field), "{} = {}", field, value);
        }
    }

    #[test]
    fn rejects_unusable_run_id_formats() {
        for fmt in ["%Y%Q", "%Y/%m/%d", "run%"] {
            let yaml = VALID.replace(
                "  num_workers: 2",
                &format!("  num_workers: 2\n  run_id_format: \"{}\"", fmt),
            );
            let err = parse_config(&yaml).unwrap_err();
            assert!(format!("{:#}", err).contains("run_id_format"), "format {}", fmt);
        }
        let ok = VALID.replace("  num_workers: 2", "  num_workers: 2\n  run_id_format: \"%Y-%m-%d_%H%M\"");
        assert!(parse_config(&ok).is_ok());
    }
}
