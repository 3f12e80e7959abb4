use crate::config_loader::MasterConfig;
use env_logger::Builder;
use log::LevelFilter;

fn level_from_str(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Log level comes from `--debug`, then the config's `log_level`, then `info`.
/// `RUST_LOG` still refines per-module filters on top of that.
pub fn initialize_logging(config: Option<&MasterConfig>, cli_matches: &clap::ArgMatches) {
    let mut builder = Builder::new();

    let log_level_str = if cli_matches.get_flag("debug") {
        "debug".to_string()
    } else {
        config
            .and_then(|c| c.app_settings.log_level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let unrecognized = match level_from_str(&log_level_str) {
        Some(level) => {
            builder.filter_level(level);
            false
        }
        None => {
            builder.filter_level(LevelFilter::Info);
            true
        }
    };
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    builder.try_init().unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}. Logging might not work as expected.", e);
    });
    if unrecognized {
        log::warn!("Unrecognized log level '{}', defaulting to info.", log_level_str);
    }
}
