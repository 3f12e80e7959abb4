use crate::core::preset::Preset;
use crate::errors::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

// --- The CaptureSource Trait ---

/// Something that can point the camera at a preset and save a still image of it.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    fn get_name(&self) -> String;

    // Saves the image under output_dir and returns its path.
    // Failures come back as data, never as a panic.
    async fn capture_image(&self, preset: &Preset, output_dir: &Path) -> Result<PathBuf, AppError>;
}
