use crate::core::run_data::{RunContext, RunReport};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CSV_FILE_NAME: &str = "count_results.csv";
pub const REPORT_FILE_NAME: &str = "report.json";
pub const LAST_RUN_FILE_NAME: &str = "last_run.json";

/// Where the run's artifacts ended up.
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub csv_path: PathBuf,
    pub report_path: PathBuf,
    pub last_run_path: PathBuf,
}

/// Summary written next to the run directories for external collaborators.
#[derive(Debug, Serialize)]
struct LastRun<'a> {
    run_id: &'a str,
    csv_path: &'a Path,
    report_path: &'a Path,
    total_count: u64,
    failed_presets: &'a BTreeSet<u16>,
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `Preset,Name,Count` for every successfully processed preset.
pub fn render_csv(report: &RunReport) -> String {
    let mut out = String::from("Preset,Name,Count\n");
    for result in report.per_preset.iter().filter(|r| !r.is_error()) {
        out.push_str(&format!(
            "{},{},{}\n",
            result.preset_number,
            csv_field(&result.preset_name),
            result.count
        ));
    }
    out
}

pub fn write_artifacts(report: &RunReport, run: &RunContext) -> Result<ReportArtifacts> {
    let results_dir = run.results_dir();
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create results directory '{}'", results_dir.display()))?;

    let csv_path = results_dir.join(CSV_FILE_NAME);
    fs::write(&csv_path, render_csv(report))
        .with_context(|| format!("Failed to write '{}'", csv_path.display()))?;

    let report_path = run.run_dir.join(REPORT_FILE_NAME);
    let report_json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(&report_path, report_json)
        .with_context(|| format!("Failed to write '{}'", report_path.display()))?;

    let base_dir = run.run_dir.parent().unwrap_or_else(|| Path::new("."));
    let last_run_path = base_dir.join(LAST_RUN_FILE_NAME);
    let last_run = LastRun {
        run_id: &report.run_id,
        csv_path: &csv_path,
        report_path: &report_path,
        total_count: report.total_count,
        failed_presets: &report.failed_presets,
    };
    fs::write(&last_run_path, serde_json::to_string_pretty(&last_run)?)
        .with_context(|| format!("Failed to write '{}'", last_run_path.display()))?;

    info!("📝 Results saved to {} with total count: {}", csv_path.display(), report.total_count);
    info!("Exported last run data to {}", last_run_path.display());
    Ok(ReportArtifacts {
        csv_path,
        report_path,
        last_run_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::run_data::DetectionResult;

    fn report() -> RunReport {
        RunReport {
            run_id: "20261016_090000".to_string(),
            per_preset: vec![
                DetectionResult {
                    preset_number: 1,
                    preset_name: "Balcony, Left".to_string(),
                    count: 3,
                    annotated_image_path: None,
                    error: None,
                },
                DetectionResult {
                    preset_number: 2,
                    preset_name: "Main".to_string(),
                    count: 0,
                    annotated_image_path: None,
                    error: Some("boom".to_string()),
                },
            ],
            total_count: 3,
            failed_presets: BTreeSet::from([4]),
        }
    }

    #[test]
    fn csv_skips_errors_and_quotes_names() {
        assert_eq!(render_csv(&report()), "Preset,Name,Count\n1,\"Balcony, Left\",3\n");
    }

    #[test]
    fn writes_all_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let run = RunContext::new("20261016_090000", tmp.path());
        let artifacts = write_artifacts(&report(), &run).unwrap();

        assert!(artifacts.csv_path.ends_with("results/count_results.csv"));
        let parsed: RunReport =
            serde_json::from_str(&fs::read_to_string(&artifacts.report_path).unwrap()).unwrap();
        assert_eq!(parsed, report());

        assert_eq!(artifacts.last_run_path, tmp.path().join(LAST_RUN_FILE_NAME));
        let last: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.last_run_path).unwrap()).unwrap();
        assert_eq!(last["total_count"], 3);
        assert_eq!(last["failed_presets"], serde_json::json!([4]));
    }
}
