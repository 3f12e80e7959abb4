use crate::app_config::DetectorConfig;
use crate::detection::clustering::count_people;
use crate::detection::{BoundingBox, Detections, Detector, DetectorFactory};
use crate::errors::AppError;
use image::{DynamicImage, ImageFormat};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::io::Cursor;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    boxes: Vec<[f32; 4]>,
}

/// Detector backed by a person-detection inference service. The service
/// returns raw boxes; the crowd count is derived here by clustering.
pub struct HttpDetector {
    client: Client,
    config: DetectorConfig,
}

impl HttpDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Detection(format!("Failed to build detector HTTP client: {}", e)))?;
        Ok(HttpDetector { client, config })
    }

    fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, AppError> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut buf, ImageFormat::Jpeg)?;
        Ok(buf.into_inner())
    }
}

impl Detector for HttpDetector {
    fn detect(&mut self, image: &DynamicImage) -> Result<Detections, AppError> {
        let start_time = Instant::now();
        let body = Self::encode_jpeg(image)?;
        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("conf", self.config.confidence), ("iou", self.config.iou)])
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .map_err(|e| AppError::Detection(format!("inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Detection(format!("inference service returned HTTP {}", status)));
        }
        let parsed: InferenceResponse = response
            .json()
            .map_err(|e| AppError::Detection(format!("malformed inference response: {}", e)))?;

        let boxes: Vec<BoundingBox> = parsed
            .boxes
            .iter()
            .map(|b| BoundingBox::new(b[0], b[1], b[2], b[3]))
            .collect();
        let count = count_people(&boxes, self.config.cluster_eps, self.config.min_cluster_size);
        debug!("Inference returned {} box(es) -> count {} in {:?}", boxes.len(), count, start_time.elapsed());
        Ok(Detections { boxes, count })
    }
}

/// Builds one [`HttpDetector`] per worker.
#[derive(Debug, Clone)]
pub struct HttpDetectorFactory {
    config: DetectorConfig,
}

impl HttpDetectorFactory {
    pub fn new(config: DetectorConfig) -> Self {
        HttpDetectorFactory { config }
    }
}

impl DetectorFactory for HttpDetectorFactory {
    fn load(&self) -> Result<Box<dyn Detector>, AppError> {
        Ok(Box::new(HttpDetector::new(self.config.clone())?))
    }
}
