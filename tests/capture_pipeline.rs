mod common_test_utils;

use common_test_utils::*;
use ptzcount::core::capture_source::CaptureSource;
use ptzcount::core::preset::Preset;
use ptzcount::core::run_data::RunContext;
use ptzcount::errors::AppError;
use ptzcount::operations::count_op::execute_count_run;
use ptzcount::operations::reprocess_op::collect_raw_image_jobs;
use ptzcount::pipeline::runner::{process_existing_jobs, PipelineOptions};
use std::collections::BTreeSet;
use std::sync::Arc;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options() -> PipelineOptions {
    PipelineOptions {
        num_workers: 2,
        jpeg_quality: 70,
    }
}

async fn snapshot_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/snapshot.jpg"))
        .and(basic_auth("operator", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(32, 24)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn capture_recalls_then_writes_the_snapshot() {
    let server = MockServer::start().await;
    snapshot_ok(&server).await;
    let (visca_port, recalled) = spawn_visca_camera(ACK_THEN_COMPLETION.to_vec()).await;
    let capturer = fast_capturer(visca_port, &server);
    let tmp = tempfile::tempdir().unwrap();

    let image_path = capturer
        .capture_image(&Preset::new(7, "Main Floor"), tmp.path())
        .await
        .unwrap();

    assert_eq!(image_path, tmp.path().join("raw_images").join("preset_007_Main_Floor.jpg"));
    assert_eq!(std::fs::read(&image_path).unwrap(), jpeg_bytes(32, 24));
    assert_eq!(*recalled.lock().unwrap(), vec![7]);
}

#[tokio::test]
async fn rejected_recall_skips_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (visca_port, _) = spawn_visca_camera(vec![0x90, 0x60, 0x41, 0xFF]).await;
    let capturer = fast_capturer(visca_port, &server);
    let tmp = tempfile::tempdir().unwrap();

    let err = capturer
        .capture_image(&Preset::new(3, "Stage"), tmp.path())
        .await
        .unwrap_err();
    match err {
        AppError::Protocol { code, message } => {
            assert_eq!(code, 0x41);
            assert_eq!(message, "Command Not Executable");
        }
        other => panic!("expected a protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn snapshot_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshot.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let (visca_port, _) = spawn_visca_camera(ACK_THEN_COMPLETION.to_vec()).await;
    let capturer = fast_capturer(visca_port, &server);
    let tmp = tempfile::tempdir().unwrap();

    let err = capturer
        .capture_image(&Preset::new(1, "Balcony"), tmp.path())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Capture(_)), "got {:?}", err);
    assert!(!tmp.path().join("raw_images").join("preset_001_Balcony.jpg").exists());
}

#[tokio::test]
async fn full_run_counts_what_it_could_capture() {
    let server = MockServer::start().await;
    // The first preset's three attempts fail, the second preset gets a real image.
    Mock::given(method("GET"))
        .and(path("/snapshot.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    snapshot_ok(&server).await;
    let (visca_port, recalled) = spawn_visca_camera(ACK_THEN_COMPLETION.to_vec()).await;
    let capturer = fast_capturer(visca_port, &server);
    let tmp = tempfile::tempdir().unwrap();
    let run = RunContext::new("20261016_093000", tmp.path());
    let presets = vec![Preset::new(1, "Balcony"), Preset::new(2, "Main")];

    let (report, artifacts) = execute_count_run(
        &capturer,
        &presets,
        Arc::new(FixedCountFactory { count: 7 }),
        &run,
        &options(),
        false,
    )
    .await
    .unwrap();

    assert_eq!(*recalled.lock().unwrap(), vec![1, 2]);
    assert_eq!(report.total_count, 7);
    assert_eq!(report.failed_presets, BTreeSet::from([1]));
    assert_eq!(report.per_preset.len(), 1);
    let main = &report.per_preset[0];
    assert_eq!((main.preset_number, main.preset_name.as_str(), main.count), (2, "Main", 7));
    assert!(main.error.is_none());

    assert_eq!(
        main.annotated_image_path.as_deref(),
        Some(run.annotated_images_dir().join("Main_2.jpg").as_path())
    );
    assert!(run.annotated_images_dir().join("Main_2.jpg").exists());
    assert!(!run.raw_images_dir().exists());

    let csv = std::fs::read_to_string(&artifacts.csv_path).unwrap();
    assert_eq!(csv, "Preset,Name,Count\n2,Main,7\n");
    assert!(artifacts.report_path.exists());
    let last_run: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&artifacts.last_run_path).unwrap()).unwrap();
    assert_eq!(last_run["run_id"], "20261016_093000");
}

#[tokio::test]
async fn kept_raw_images_can_be_reprocessed() {
    let server = MockServer::start().await;
    snapshot_ok(&server).await;
    let (visca_port, _) = spawn_visca_camera(ACK_THEN_COMPLETION.to_vec()).await;
    let capturer = fast_capturer(visca_port, &server);
    let tmp = tempfile::tempdir().unwrap();
    let run = RunContext::new("20261016_094500", tmp.path());
    let presets = vec![
        Preset::new(4, "Overflow Room"),
        Preset::new(1, "Balcony"),
        Preset::new(9, "Stage"),
    ];

    let (first, _) = execute_count_run(
        &capturer,
        &presets,
        Arc::new(FixedCountFactory { count: 2 }),
        &run,
        &options(),
        true,
    )
    .await
    .unwrap();
    assert_eq!(first.total_count, 6);
    assert!(first.failed_presets.is_empty());

    let jobs = collect_raw_image_jobs(&run.raw_images_dir()).unwrap();
    let names: Vec<&str> = jobs.iter().map(|j| j.preset_name.as_str()).collect();
    assert_eq!(names, vec!["Balcony", "Overflow Room", "Stage"]);

    let second = process_existing_jobs(jobs, Arc::new(FixedCountFactory { count: 5 }), &run, &options()).await;
    assert_eq!(second.total_count, 15);
    let numbers: Vec<u16> = second.per_preset.iter().map(|r| r.preset_number).collect();
    assert_eq!(numbers, vec![1, 4, 9]);
}
