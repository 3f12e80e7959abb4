use chrono::{DateTime, Local};
use log::warn;
use std::fmt::Write;

const FALLBACK_FORMAT: &str = "%Y%m%d_%H%M%S";

// Get current local timestamp as a formatted string.
// An unusable pattern falls back to `%Y%m%d_%H%M%S` instead of panicking.
pub fn current_local_timestamp_str(format_str: &str) -> String {
    let now: DateTime<Local> = Local::now();
    let mut out = String::new();
    if write!(out, "{}", now.format(format_str)).is_err() {
        warn!("⚠️ Invalid timestamp format '{}', using '{}'", format_str, FALLBACK_FORMAT);
        out = now.format(FALLBACK_FORMAT).to_string();
    }
    out
}

/// Run identifier for a fresh run, e.g. `20261016_091500`.
pub fn new_run_id(format_str: &str) -> String {
    current_local_timestamp_str(format_str)
}
