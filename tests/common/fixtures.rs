use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use uuid::Uuid;

use restage::detector::DetectionModel;
use restage::error::RestageError;
use restage::models::{DetectedRegion, OverlayObject};

/// Solid-color RGBA test image.
pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_pixel(width, height, Rgba(color)))
}

/// Test image where each pixel encodes its own coordinates, so crops can be
/// checked against the region they came from.
pub fn coordinate_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
    }))
}

/// PNG-encode an image for feeding through the decode path.
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("failed to encode test image");
    bytes
}

pub fn region(x: f32, y: f32, width: f32, height: f32) -> DetectedRegion {
    DetectedRegion {
        x,
        y,
        width,
        height,
        label: "person".to_string(),
        score: 0.9,
    }
}

pub fn labeled_region(label: &str, x: f32, y: f32, width: f32, height: f32) -> DetectedRegion {
    DetectedRegion {
        label: label.to_string(),
        ..region(x, y, width, height)
    }
}

/// Build an overlay object directly, bypassing extraction.
pub fn overlay_object(x: f32, y: f32, width: u32, height: u32) -> OverlayObject {
    OverlayObject {
        id: Uuid::new_v4(),
        x,
        y,
        width,
        height,
        cropped: solid_image(width, height, [10, 20, 30, 255]),
        original_x: x,
        original_y: y,
        label: "person".to_string(),
    }
}

/// Detection backend stub returning a fixed region list, optionally after a
/// delay to let tests overlap runs with image loads.
pub struct StubModel {
    pub regions: Vec<DetectedRegion>,
    pub delay: Option<Duration>,
}

impl StubModel {
    pub fn returning(regions: Vec<DetectedRegion>) -> Arc<Self> {
        Arc::new(Self {
            regions,
            delay: None,
        })
    }
}

impl DetectionModel for StubModel {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<DetectedRegion>, RestageError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(self.regions.clone())
    }
}

/// Detection backend stub that always fails.
pub struct FailingModel;

impl DetectionModel for FailingModel {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<DetectedRegion>, RestageError> {
        Err(RestageError::Inference("model exploded".to_string()))
    }
}
