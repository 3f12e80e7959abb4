use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::preset::CaptureJob;

/// Per-job outcome produced by a processing worker. `error` and a successful
/// `count` are mutually exclusive: an errored result always carries `count = 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub preset_number: u16,
    pub preset_name: String,
    pub count: u32,
    pub annotated_image_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn success(job: &CaptureJob, count: u32, annotated_image_path: PathBuf) -> Self {
        DetectionResult {
            preset_number: job.preset_number,
            preset_name: job.preset_name.clone(),
            count,
            annotated_image_path: Some(annotated_image_path),
            error: None,
        }
    }

    pub fn failure(job: &CaptureJob, error: impl Into<String>) -> Self {
        DetectionResult {
            preset_number: job.preset_number,
            preset_name: job.preset_name.clone(),
            count: 0,
            annotated_image_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The aggregated, ordered outcome of one full run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub per_preset: Vec<DetectionResult>,
    pub total_count: u64,
    pub failed_presets: BTreeSet<u16>,
}

/// Explicit state for one run, passed into the pipeline instead of living in globals.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_dir: PathBuf,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>, output_base: &Path) -> Self {
        let run_id = run_id.into();
        let run_dir = output_base.join(format!("run_{}", run_id));
        RunContext { run_id, run_dir }
    }

    pub fn raw_images_dir(&self) -> PathBuf {
        self.run_dir.join(crate::common::file_utils::RAW_IMAGES_DIR)
    }

    pub fn annotated_images_dir(&self) -> PathBuf {
        self.run_dir.join(crate::common::file_utils::ANNOTATED_IMAGES_DIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.run_dir.join("results")
    }
}
