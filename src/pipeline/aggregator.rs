use crate::core::run_data::{DetectionResult, RunReport};
use crossbeam_channel::Receiver;
use log::{debug, info};
use std::collections::BTreeSet;

/// Takes whatever is already in the result channel. Only call this after
/// `WorkerPool::stop_workers` has joined every worker; it never blocks.
pub fn drain_results(result_rx: &Receiver<DetectionResult>) -> Vec<DetectionResult> {
    let results: Vec<DetectionResult> = result_rx.try_iter().collect();
    debug!("Drained {} result(s) from the result channel", results.len());
    results
}

/// Reduces results into the run's report. Output order is by preset number,
/// whatever order the workers finished in.
pub fn build_report(run_id: &str, mut results: Vec<DetectionResult>, failed_presets: BTreeSet<u16>) -> RunReport {
    results.sort_by(|a, b| {
        a.preset_number
            .cmp(&b.preset_number)
            .then_with(|| a.preset_name.cmp(&b.preset_name))
    });
    let total_count = results
        .iter()
        .filter(|r| !r.is_error())
        .map(|r| u64::from(r.count))
        .sum();
    let errored = results.iter().filter(|r| r.is_error()).count();

    info!(
        "📊 Run {}: total count {} across {} result(s) ({} processing error(s), {} capture failure(s))",
        run_id,
        total_count,
        results.len(),
        errored,
        failed_presets.len()
    );
    RunReport {
        run_id: run_id.to_string(),
        per_preset: results,
        total_count,
        failed_presets,
    }
}
