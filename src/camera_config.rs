use serde::Deserialize;

/// Upper bound for any camera timeout or delay, in seconds.
pub const MAX_CAMERA_DELAY_SECS: f32 = 3600.0;

fn default_visca_port() -> u16 {
    5678
}

fn default_command_timeout_secs() -> f32 {
    15.0
}

fn default_retry_delay_secs() -> f32 {
    1.0
}

fn default_settle_delay_secs() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    pub name: String,
    pub ip: String,
    pub username: String,
    pub password: Option<String>, // Fallback when <NAME>_PASSWORD is not set
    #[serde(default = "default_visca_port")]
    pub visca_port: u16,
    pub http_port: Option<u16>, // None means port 80
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: f32,
    #[serde(default = "default_retry_delay_secs")]
    pub command_retry_delay_secs: f32,
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PresetConfig {
    pub number: u16,
    pub name: Option<String>, // Defaults to "Preset <number>"
}
