pub mod labels;
mod onnx;

pub use labels::COCO_LABELS;
pub use onnx::OnnxModel;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use log::info;

use crate::error::RestageError;
use crate::models::DetectedRegion;

/// Pluggable detection backend. `detect` is a blocking call; the surrounding
/// [`ObjectDetector`] moves it off the cooperative timeline. Returned bbox
/// coordinates are extents in source-raster pixel space.
pub trait DetectionModel: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedRegion>, RestageError>;
}

type ModelLoader = dyn Fn() -> Result<Arc<dyn DetectionModel>, RestageError> + Send + Sync;

/// Runs object detection over rasters.
///
/// The underlying model is loaded lazily on the first call and cached for
/// the lifetime of the process, so the first detection pays a one-time load
/// cost and later ones reuse the session.
pub struct ObjectDetector {
    loader: Arc<ModelLoader>,
    // Lazy-initialized model, initialized once on first use.
    // Arc so the reference can be cloned out and the lock released.
    model: Mutex<Option<Arc<dyn DetectionModel>>>,
}

impl ObjectDetector {
    pub fn new(
        loader: impl Fn() -> Result<Arc<dyn DetectionModel>, RestageError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            loader: Arc::new(loader),
            model: Mutex::new(None),
        }
    }

    /// Detector backed by a YOLOv8-family ONNX model on disk. The file is
    /// not touched until the first `detect` call.
    pub fn from_model_file(path: PathBuf) -> Self {
        Self::new(move || Ok(Arc::new(OnnxModel::load(&path)?) as Arc<dyn DetectionModel>))
    }

    /// Detector backed by an already-constructed model (used by tests to
    /// substitute a stub backend).
    pub fn from_model(model: Arc<dyn DetectionModel>) -> Self {
        Self::new(move || Ok(model.clone()))
    }

    /// Detect objects in `image`. Model load and inference both run on a
    /// blocking thread so other work on the timeline keeps moving.
    ///
    /// An empty result means nothing passed the model's confidence threshold
    /// and is not an error.
    pub async fn detect(
        &self,
        image: &Arc<DynamicImage>,
    ) -> Result<Vec<DetectedRegion>, RestageError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RestageError::Inference(
                "raster has zero dimensions".to_string(),
            ));
        }
        let model = match self.cached_model() {
            Some(model) => model,
            None => self.load_model().await?,
        };
        let image = Arc::clone(image);
        tokio::task::spawn_blocking(move || model.detect(&image))
            .await
            .map_err(|e| RestageError::Inference(format!("inference task failed: {e}")))?
    }

    fn cached_model(&self) -> Option<Arc<dyn DetectionModel>> {
        self.model.lock().unwrap().clone()
    }

    async fn load_model(&self) -> Result<Arc<dyn DetectionModel>, RestageError> {
        info!("loading detection model");
        let loader = Arc::clone(&self.loader);
        let loaded = tokio::task::spawn_blocking(move || loader())
            .await
            .map_err(|e| RestageError::Inference(format!("model load task failed: {e}")))??;
        // Another caller may have finished loading first; keep whichever
        // landed in the cache.
        let mut guard = self.model.lock().unwrap();
        Ok(guard.get_or_insert_with(|| loaded).clone())
    }
}
