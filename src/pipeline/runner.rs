use crate::core::capture_source::CaptureSource;
use crate::core::preset::{CaptureJob, Preset};
use crate::core::run_data::{RunContext, RunReport};
use crate::detection::DetectorFactory;
use crate::pipeline::aggregator::{build_report, drain_results};
use crate::pipeline::dispatcher::{WorkerPool, WorkerSettings};
use crate::pipeline::orchestrator::capture_and_dispatch;
use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub num_workers: usize,
    pub jpeg_quality: u8,
}

fn worker_settings(run: &RunContext, options: &PipelineOptions) -> WorkerSettings {
    WorkerSettings {
        annotated_dir: run.annotated_images_dir(),
        jpeg_quality: options.jpeg_quality,
    }
}

/// Full run: start the pool, capture every preset into it, drain, report.
pub async fn run_counting_pipeline<C>(
    source: &C,
    presets: &[Preset],
    factory: Arc<dyn DetectorFactory>,
    run: &RunContext,
    options: &PipelineOptions,
) -> RunReport
where
    C: CaptureSource + ?Sized,
{
    let start_time = Instant::now();
    let mut pool = WorkerPool::start(options.num_workers, factory, worker_settings(run, options));

    let failed_presets = capture_and_dispatch(source, presets, &run.run_dir, &mut pool).await;
    let dispatched = pool.dispatched();

    info!("⏳ Processing {} image(s) with {} worker(s)...", dispatched, pool.size());
    let result_rx = pool.stop_workers().await;
    let results = drain_results(&result_rx);
    info!("Processing complete: {} results collected for {} dispatched job(s)", results.len(), dispatched);

    let report = build_report(&run.run_id, results, failed_presets);
    info!("🏁 Pipeline for run {} finished in {:?}", run.run_id, start_time.elapsed());
    report
}

/// Detection and aggregation only, for images that are already on disk.
pub async fn process_existing_jobs(
    jobs: Vec<CaptureJob>,
    factory: Arc<dyn DetectorFactory>,
    run: &RunContext,
    options: &PipelineOptions,
) -> RunReport {
    let mut pool = WorkerPool::start(options.num_workers, factory, worker_settings(run, options));
    for job in jobs {
        pool.submit(job);
    }
    let result_rx = pool.stop_workers().await;
    build_report(&run.run_id, drain_results(&result_rx), BTreeSet::new())
}
