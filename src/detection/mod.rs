//! The Detector capability: image in, person boxes and a crowd count out.
//!
//! Workers load one detector per thread through a [`DetectorFactory`] and
//! reuse it for every job they pull.

pub mod annotation;
pub mod clustering;
pub mod http_detector;

use crate::errors::AppError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BoundingBox { x1, y1, x2, y2 }
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2].iter().all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    pub boxes: Vec<BoundingBox>,
    pub count: u32,
}

impl Detections {
    /// Rejects output a worker cannot annotate or trust.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(bad) = self.boxes.iter().find(|b| !b.is_well_formed()) {
            return Err(AppError::Detection(format!("malformed bounding box {:?}", bad)));
        }
        Ok(())
    }
}

pub trait Detector: Send {
    fn detect(&mut self, image: &DynamicImage) -> Result<Detections, AppError>;
}

pub trait DetectorFactory: Send + Sync {
    fn load(&self) -> Result<Box<dyn Detector>, AppError>;
}
