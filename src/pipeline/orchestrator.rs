use crate::core::capture_source::CaptureSource;
use crate::core::preset::{CaptureJob, Preset};
use crate::pipeline::dispatcher::WorkerPool;
use futures::FutureExt;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Instant;

/// Successful captures in preset order, plus the presets that could not be captured.
#[derive(Debug, Default)]
pub struct CaptureOutcome {
    pub jobs: Vec<CaptureJob>,
    pub failed_presets: BTreeSet<u16>,
}

/// Captures every preset in order. A failed preset is recorded and skipped.
pub async fn capture_all<C>(source: &C, presets: &[Preset], output_dir: &Path) -> CaptureOutcome
where
    C: CaptureSource + ?Sized,
{
    let mut jobs = Vec::with_capacity(presets.len());
    let failed_presets = capture_each(source, presets, output_dir, |job| jobs.push(job)).await;
    CaptureOutcome { jobs, failed_presets }
}

/// Like [`capture_all`], but each job goes to the pool as soon as it is captured
/// so detection overlaps the remaining camera moves. Returns the failed presets.
pub async fn capture_and_dispatch<C>(
    source: &C,
    presets: &[Preset],
    output_dir: &Path,
    pool: &mut WorkerPool,
) -> BTreeSet<u16>
where
    C: CaptureSource + ?Sized,
{
    capture_each(source, presets, output_dir, |job| pool.submit(job)).await
}

async fn capture_each<C, F>(source: &C, presets: &[Preset], output_dir: &Path, mut on_job: F) -> BTreeSet<u16>
where
    C: CaptureSource + ?Sized,
    F: FnMut(CaptureJob),
{
    let start_time = Instant::now();
    info!("📷 Starting image capture of {} preset(s) on '{}'", presets.len(), source.get_name());
    let mut failed_presets = BTreeSet::new();
    let mut captured = 0usize;

    for preset in presets {
        let attempt = AssertUnwindSafe(source.capture_image(preset, output_dir)).catch_unwind().await;
        match attempt {
            Ok(Ok(image_path)) => {
                captured += 1;
                on_job(CaptureJob::new(preset, image_path));
            }
            Ok(Err(e)) => {
                error!("❌ Failed to capture preset {}: {}", preset, e);
                failed_presets.insert(preset.number);
            }
            Err(_) => {
                error!("💀 Capture of preset {} panicked", preset);
                failed_presets.insert(preset.number);
            }
        }
    }

    if !failed_presets.is_empty() {
        warn!("⚠️ Failed to capture {} preset(s): {:?}", failed_presets.len(), failed_presets);
    }
    info!(
        "Capture complete: {} successful, {} failed in {:?}",
        captured,
        failed_presets.len(),
        start_time.elapsed()
    );
    failed_presets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capture_source::CaptureSource;
    use crate::errors::AppError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Fails the listed presets, panics on 99, and records call order.
    struct ScriptedSource {
        failing: Vec<u16>,
        calls: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl CaptureSource for ScriptedSource {
        fn get_name(&self) -> String {
            "scripted".to_string()
        }

        async fn capture_image(&self, preset: &Preset, output_dir: &Path) -> Result<PathBuf, AppError> {
            self.calls.lock().unwrap().push(preset.number);
            if preset.number == 99 {
                panic!("camera driver crashed");
            }
            if self.failing.contains(&preset.number) {
                return Err(AppError::Capture(format!("preset {} unreachable", preset.number)));
            }
            Ok(output_dir.join(format!("preset_{:03}.jpg", preset.number)))
        }
    }

    fn presets(numbers: &[u16]) -> Vec<Preset> {
        numbers.iter().map(|n| Preset::new(*n, format!("P{}", n))).collect()
    }

    #[tokio::test]
    async fn failures_are_isolated_and_order_is_kept() {
        let source = ScriptedSource {
            failing: vec![2, 5],
            calls: Mutex::new(Vec::new()),
        };
        let all = presets(&[4, 2, 7, 5, 1, 3]);
        let outcome = capture_all(&source, &all, Path::new("/tmp/run")).await;

        assert_eq!(*source.calls.lock().unwrap(), vec![4, 2, 7, 5, 1, 3]);
        let numbers: Vec<u16> = outcome.jobs.iter().map(|j| j.preset_number).collect();
        assert_eq!(numbers, vec![4, 7, 1, 3]);
        assert_eq!(outcome.failed_presets, BTreeSet::from([2, 5]));
        assert_eq!(outcome.jobs[0].image_path, PathBuf::from("/tmp/run/preset_004.jpg"));
    }

    #[tokio::test]
    async fn panicking_capture_is_recorded_as_failed() {
        let source = ScriptedSource {
            failing: vec![],
            calls: Mutex::new(Vec::new()),
        };
        let outcome = capture_all(&source, &presets(&[1, 99, 2]), Path::new("out")).await;
        assert_eq!(outcome.jobs.len(), 2);
        assert_eq!(outcome.failed_presets, BTreeSet::from([99]));
    }
}
