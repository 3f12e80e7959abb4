//! Fixed-size pool of detection workers.
//!
//! Workers share one unbounded FIFO work queue and one unbounded result
//! channel. Shutdown is by sentinel: `stop_workers` enqueues one
//! [`WorkItem::Stop`] per worker after the last job and then joins them all.

use crate::common::file_utils::annotated_image_file_name;
use crate::core::preset::CaptureJob;
use crate::core::run_data::DetectionResult;
use crate::detection::annotation;
use crate::detection::{Detector, DetectorFactory};
use crate::errors::AppError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Item carried by the work queue.
#[derive(Debug)]
pub enum WorkItem {
    Job(CaptureJob),
    Stop,
}

/// Per-run settings every worker needs.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub annotated_dir: PathBuf,
    pub jpeg_quality: u8,
}

/// `min(available parallelism, configured)`, never below one.
pub fn pool_size(configured: usize) -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    configured.min(available).max(1)
}

pub struct WorkerPool {
    work_tx: Sender<WorkItem>,
    // Kept so jobs stranded by a dead worker can still be accounted for after the join.
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<DetectionResult>,
    result_rx: Receiver<DetectionResult>,
    handles: Vec<JoinHandle<()>>,
    dispatched: usize,
}

impl WorkerPool {
    /// Spawns `num_workers` blocking workers. Must be called inside a Tokio runtime.
    pub fn start(num_workers: usize, factory: Arc<dyn DetectorFactory>, settings: WorkerSettings) -> Self {
        let num_workers = num_workers.max(1);
        info!("🧵 Starting {} image processing worker(s)", num_workers);
        let (work_tx, work_rx) = unbounded::<WorkItem>();
        let (result_tx, result_rx) = unbounded::<DetectionResult>();

        let handles = (0..num_workers)
            .map(|worker_index| {
                let factory = Arc::clone(&factory);
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let settings = settings.clone();
                tokio::task::spawn_blocking(move || {
                    run_worker(worker_index, factory.as_ref(), work_rx, result_tx, &settings)
                })
            })
            .collect();

        WorkerPool {
            work_tx,
            work_rx,
            result_tx,
            result_rx,
            handles,
            dispatched: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn submit(&mut self, job: CaptureJob) {
        debug!("Queueing preset {} for processing: {}", job.preset_number, job.image_path.display());
        // The pool holds a receiver, so the queue cannot be disconnected here.
        if let Err(e) = self.work_tx.send(WorkItem::Job(job)) {
            if let WorkItem::Job(job) = e.into_inner() {
                let _ = self.result_tx.send(DetectionResult::failure(&job, "work queue closed"));
            }
        }
        self.dispatched += 1;
    }

    /// Sends one sentinel per worker, waits for every worker to exit, and hands
    /// back the result channel for draining.
    pub async fn stop_workers(self) -> Receiver<DetectionResult> {
        let start_time = Instant::now();
        info!("🛑 Sending stop signals to {} worker(s)", self.handles.len());
        for _ in 0..self.handles.len() {
            let _ = self.work_tx.send(WorkItem::Stop);
        }

        for (i, joined) in join_all(self.handles).await.into_iter().enumerate() {
            if let Err(join_err) = joined {
                error!("💀 Processing worker #{} died (panic or cancellation): {}", i, join_err);
            }
        }

        // Only possible when a worker died with work still queued.
        for item in self.work_rx.try_iter() {
            if let WorkItem::Job(job) = item {
                warn!("Preset {} was never processed; recording it as failed", job.preset_number);
                let _ = self
                    .result_tx
                    .send(DetectionResult::failure(&job, "no processing worker available"));
            }
        }

        info!(
            "✅ All processing workers have completed ({} job(s) dispatched) in {:?}",
            self.dispatched,
            start_time.elapsed()
        );
        self.result_rx
    }
}

fn run_worker(
    worker_index: usize,
    factory: &dyn DetectorFactory,
    work_rx: Receiver<WorkItem>,
    result_tx: Sender<DetectionResult>,
    settings: &WorkerSettings,
) {
    debug!("Worker #{} starting", worker_index);
    let mut detector = factory.load().map_err(|e| {
        error!("❌ Worker #{} failed to load detector: {}", worker_index, e);
        e.to_string()
    });

    let mut processed = 0usize;
    loop {
        let job = match work_rx.recv() {
            Ok(WorkItem::Job(job)) => job,
            Ok(WorkItem::Stop) => {
                debug!("Worker #{} received stop signal", worker_index);
                break;
            }
            Err(_) => break,
        };

        let result = match detector.as_mut() {
            Ok(detector) => process_job(&mut **detector, &job, settings),
            Err(load_error) => DetectionResult::failure(&job, format!("detector unavailable: {}", load_error)),
        };
        if let Some(err) = &result.error {
            error!("❌ Error processing preset {} ({}): {}", job.preset_number, job.image_path.display(), err);
        }
        processed += 1;
        if result_tx.send(result).is_err() {
            error!("Result channel closed, stopping worker #{}", worker_index);
            break;
        }
    }
    debug!("Worker #{} exiting after {} job(s)", worker_index, processed);
}

/// Runs detection and annotation for one job. Any failure, panics included,
/// becomes an error result.
fn process_job(detector: &mut dyn Detector, job: &CaptureJob, settings: &WorkerSettings) -> DetectionResult {
    let start_time = Instant::now();
    info!("🔍 Processing image: {}", job.image_path.display());
    match panic::catch_unwind(AssertUnwindSafe(|| detect_and_annotate(detector, job, settings))) {
        Ok(Ok(result)) => {
            info!(
                "Saved annotated image for preset {}, Count: {} ({:?})",
                job.preset_number,
                result.count,
                start_time.elapsed()
            );
            result
        }
        Ok(Err(e)) => DetectionResult::failure(job, e.to_string()),
        Err(payload) => DetectionResult::failure(job, format!("detector panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn detect_and_annotate(
    detector: &mut dyn Detector,
    job: &CaptureJob,
    settings: &WorkerSettings,
) -> Result<DetectionResult, AppError> {
    let image = image::open(&job.image_path)
        .map_err(|e| AppError::Detection(format!("Failed to load image {}: {}", job.image_path.display(), e)))?;
    let detections = detector.detect(&image)?;
    detections.validate()?;

    let annotated = annotation::annotate(&image, &detections.boxes, detections.count);
    let annotated_path = settings
        .annotated_dir
        .join(annotated_image_file_name(job.preset_number, &job.preset_name));
    annotation::save_jpeg(&annotated, &annotated_path, settings.jpeg_quality)?;
    Ok(DetectionResult::success(job, detections.count, annotated_path))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
