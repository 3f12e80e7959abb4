use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const MIN_PRESET_NUMBER: u16 = 1;
pub const MAX_PRESET_NUMBER: u16 = 256;

/// A named, numbered camera viewpoint the PTZ camera can recall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub number: u16,
    pub name: String,
}

impl Preset {
    pub fn new(number: u16, name: impl Into<String>) -> Self {
        Preset {
            number,
            name: name.into(),
        }
    }

    pub fn is_valid_number(number: u16) -> bool {
        (MIN_PRESET_NUMBER..=MAX_PRESET_NUMBER).contains(&number)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number, self.name)
    }
}

/// Unit of work handed from capture to processing. Moved into the work queue,
/// after which the worker that dequeues it owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureJob {
    pub preset_number: u16,
    pub preset_name: String,
    pub image_path: PathBuf,
}

impl CaptureJob {
    pub fn new(preset: &Preset, image_path: PathBuf) -> Self {
        CaptureJob {
            preset_number: preset.number,
            preset_name: preset.name.clone(),
            image_path,
        }
    }
}
