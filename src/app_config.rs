use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApplicationConfig {
    pub output_directory: String,
    pub run_id_format: String, // strftime format string, also names the run directory
    pub num_workers: usize,    // capped by available parallelism at runtime
    pub annotated_jpeg_quality: u8,
    pub keep_raw_images: bool,
    pub log_level: Option<String>, // Optional so CLI or env var can take over
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            output_directory: "./output".to_string(),
            run_id_format: "%Y%m%d_%H%M%S".to_string(),
            num_workers: 4,
            annotated_jpeg_quality: 70,
            keep_raw_images: false,
            log_level: Some("info".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    pub endpoint: String,
    pub confidence: f32,
    pub iou: f32,
    pub cluster_eps: f32,
    pub min_cluster_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            endpoint: "http://127.0.0.1:8000/detect".to_string(),
            confidence: 0.25,
            iou: 0.45,
            cluster_eps: 50.0,
            min_cluster_size: 2,
            request_timeout_secs: 60,
        }
    }
}
