use crate::camera::camera_entity::CameraEntity;
use crate::camera::visca::ViscaController;
use crate::common::file_utils;
use crate::core::capture_source::CaptureSource;
use crate::core::preset::Preset;
use crate::errors::AppError;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Retry budget for the snapshot GET.
#[derive(Debug, Clone)]
pub struct SnapshotPolicy {
    pub attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        SnapshotPolicy {
            attempts: 3,
            retry_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Recalls a preset over VISCA, waits for the head to settle, then pulls a
/// JPEG snapshot over HTTP basic auth.
pub struct ImageCapturer {
    name: String,
    controller: ViscaController,
    client: Client,
    snapshot_url: String,
    username: String,
    password: Option<String>,
    settle_delay: Duration,
    policy: SnapshotPolicy,
}

impl ImageCapturer {
    pub fn new(camera: &CameraEntity) -> Result<Self, AppError> {
        Self::with_parts(
            camera,
            ViscaController::from_camera(camera),
            camera.snapshot_url(),
            camera.settle_delay(),
            SnapshotPolicy::default(),
        )
    }

    pub fn with_parts(
        camera: &CameraEntity,
        controller: ViscaController,
        snapshot_url: String,
        settle_delay: Duration,
        policy: SnapshotPolicy,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(policy.request_timeout)
            .build()
            .map_err(|e| AppError::TransientNetwork(format!("Failed to build HTTP client: {}", e)))?;
        Ok(ImageCapturer {
            name: camera.config.name.clone(),
            controller,
            client,
            snapshot_url,
            username: camera.config.username.clone(),
            password: camera.get_password().map(str::to_string),
            settle_delay,
            policy,
        })
    }

    async fn fetch_snapshot(&self, preset: &Preset) -> Result<Vec<u8>, AppError> {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            info!(
                "📸 Capturing image for preset {} (Attempt {}/{})",
                preset.number, attempt, attempts
            );
            let request = self
                .client
                .get(&self.snapshot_url)
                .basic_auth(&self.username, self.password.as_deref());
            match request.send().await {
                Ok(response) if response.status() == StatusCode::OK => match response.bytes().await {
                    Ok(bytes) => return Ok(bytes.to_vec()),
                    Err(e) => {
                        last_error = format!("failed reading snapshot body: {}", e);
                    }
                },
                Ok(response) => {
                    last_error = format!("HTTP {}", response.status());
                }
                Err(e) => {
                    last_error = format!("request failed: {}", e);
                }
            }
            error!(
                "Failed to capture image for preset {}: {} (Attempt {}/{})",
                preset.number, last_error, attempt, attempts
            );
            if attempt < attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }
        Err(AppError::Capture(format!(
            "snapshot for preset {} failed after {} attempts: {}",
            preset.number, attempts, last_error
        )))
    }
}

/// Writes the snapshot under a hidden staging name and renames it into place,
/// so an interrupted write never leaves a `preset_*.jpg` behind.
pub(crate) async fn write_image(image_path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let file_name = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Io(format!("Invalid image path {}", image_path.display())))?;
    let staging_path = image_path.with_file_name(format!(".{}.part", file_name));

    let mut file = File::create(&staging_path).await.map_err(|e| {
        AppError::Io(format!("Failed to create file {}: {}", staging_path.display(), e))
    })?;
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&staging_path, image_path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(&staging_path).await {
            warn!("Could not remove partial image {}: {}", staging_path.display(), remove_err);
        }
        return Err(AppError::Io(format!("Failed to write image {}: {}", image_path.display(), e)));
    }
    Ok(())
}

#[async_trait]
impl CaptureSource for ImageCapturer {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn capture_image(&self, preset: &Preset, output_dir: &Path) -> Result<PathBuf, AppError> {
        let start_time = Instant::now();
        info!("🎯 Recalling preset {} on '{}'", preset, self.name);

        if let Err(e) = self.controller.recall_preset(preset.number).await {
            error!("❌ Failed to recall preset {}: {}", preset.number, e);
            return Err(e);
        }

        debug!("Waiting {:?} for the camera to settle", self.settle_delay);
        tokio::time::sleep(self.settle_delay).await;

        let raw_dir = file_utils::ensure_output_directory(&output_dir.join(file_utils::RAW_IMAGES_DIR))?;
        let image_path = raw_dir.join(file_utils::raw_image_file_name(preset));

        let bytes = self.fetch_snapshot(preset).await?;
        if bytes.is_empty() {
            warn!("Camera '{}' returned an empty snapshot for preset {}", self.name, preset.number);
        }

        write_image(&image_path, &bytes).await?;

        info!(
            "✅ Captured preset {} ({} bytes) to {} in {:?}",
            preset.number,
            bytes.len(),
            image_path.display(),
            start_time.elapsed()
        );
        Ok(image_path)
    }
}
