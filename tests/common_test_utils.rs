// Shared helpers for the integration tests: a scripted VISCA camera on a local
// TCP port, a wiremock snapshot endpoint, and in-process detectors.
#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, RgbImage};
use ptzcount::camera::camera_entity::CameraEntity;
use ptzcount::camera::image_capturer::{ImageCapturer, SnapshotPolicy};
use ptzcount::camera::visca::ViscaController;
use ptzcount::camera_config::CameraConfig;
use ptzcount::detection::{BoundingBox, Detections, Detector, DetectorFactory};
use ptzcount::errors::AppError;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const ACK_THEN_COMPLETION: [u8; 6] = [0x90, 0x41, 0xFF, 0x90, 0x51, 0xFF];

/// Local VISCA camera. Every connection gets `reply` after the 7-byte command;
/// the preset byte of each command is recorded in order.
pub async fn spawn_visca_camera(reply: Vec<u8>) -> (u16, Arc<Mutex<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let recalled = Arc::new(Mutex::new(Vec::new()));
    let log = recalled.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut cmd = [0u8; 7];
                if socket.read_exact(&mut cmd).await.is_err() {
                    return;
                }
                log.lock().unwrap().push(cmd[5]);
                let _ = socket.write_all(&reply).await;
                tokio::time::sleep(Duration::from_secs(2)).await;
            });
        }
    });
    (port, recalled)
}

pub fn camera_config(visca_port: u16, http_port: u16) -> CameraConfig {
    CameraConfig {
        name: "test-cam".to_string(),
        ip: "127.0.0.1".to_string(),
        username: "operator".to_string(),
        password: Some("secret".to_string()),
        visca_port,
        http_port: Some(http_port),
        command_timeout_secs: 1.0,
        command_retry_delay_secs: 0.05,
        settle_delay_secs: 0.0,
    }
}

/// Capturer pointed at the mock camera and the wiremock server, with short delays.
pub fn fast_capturer(visca_port: u16, server: &MockServer) -> ImageCapturer {
    let http_port = server.address().port();
    let camera = CameraEntity::new(camera_config(visca_port, http_port));
    let controller = ViscaController::new(
        camera.visca_address(),
        Duration::from_millis(500),
        Duration::from_millis(20),
    );
    let policy = SnapshotPolicy {
        attempts: 3,
        retry_delay: Duration::from_millis(20),
        request_timeout: Duration::from_secs(2),
    };
    ImageCapturer::with_parts(&camera, controller, camera.snapshot_url(), Duration::ZERO, policy).unwrap()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

/// Always reports `count` people with a single box.
pub struct FixedCountFactory {
    pub count: u32,
}

struct FixedCountDetector {
    count: u32,
}

impl Detector for FixedCountDetector {
    fn detect(&mut self, _image: &DynamicImage) -> Result<Detections, AppError> {
        Ok(Detections {
            boxes: vec![BoundingBox::new(2.0, 2.0, 10.0, 12.0)],
            count: self.count,
        })
    }
}

impl DetectorFactory for FixedCountFactory {
    fn load(&self) -> Result<Box<dyn Detector>, AppError> {
        Ok(Box::new(FixedCountDetector { count: self.count }))
    }
}
