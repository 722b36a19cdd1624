use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use log::{debug, info};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::compositor::SceneCompositor;
use crate::detector::ObjectDetector;
use crate::error::RestageError;
use crate::extractor::extract_regions;
use crate::loader::decode_image;
use crate::models::OverlayObject;
use crate::overlay::{Generation, OverlayStore};

/// A completed detect+extract run, tagged with the image generation it was
/// started against so stale runs can be told apart from current ones.
struct DetectionRun {
    generation: Generation,
    objects: Vec<OverlayObject>,
}

/// One editing session: the loaded base raster, the overlay scene, and
/// whatever detection run is currently in flight.
///
/// Loading a new image resets the scene before any previous run can publish;
/// a run that completes late is discarded by the generation check in
/// [`OverlayStore::populate`], so stale objects never reach the scene.
pub struct EditorSession {
    detector: Arc<ObjectDetector>,
    compositor: SceneCompositor,
    base: Option<Arc<DynamicImage>>,
    store: OverlayStore,
    detect_task: Option<JoinHandle<Result<DetectionRun, RestageError>>>,
}

impl EditorSession {
    pub fn new(detector: Arc<ObjectDetector>) -> Self {
        Self {
            detector,
            compositor: SceneCompositor::default(),
            base: None,
            store: OverlayStore::new(),
            detect_task: None,
        }
    }

    pub fn with_compositor(mut self, compositor: SceneCompositor) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn base(&self) -> Option<&Arc<DynamicImage>> {
        self.base.as_ref()
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    /// Decode `bytes` as the new base image and reset the scene.
    ///
    /// Any in-flight detection for the previous image is aborted
    /// (best-effort); even if it still completes, its generation no longer
    /// matches and its results are discarded.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(u32, u32), RestageError> {
        if let Some(task) = self.detect_task.take() {
            task.abort();
            debug!("aborted in-flight detection for a superseded image");
        }
        let raster = decode_image(bytes)?;
        let dimensions = (raster.width(), raster.height());
        self.base = Some(Arc::new(raster));
        self.store.reset();
        info!("loaded {}x{} base image", dimensions.0, dimensions.1);
        Ok(dimensions)
    }

    /// Kick off detection + extraction for the current image. The scene is
    /// not touched until [`finish_detection`](Self::finish_detection)
    /// publishes the completed batch.
    pub fn start_detection(&mut self) -> Result<(), RestageError> {
        let base = self
            .base
            .clone()
            .ok_or_else(|| RestageError::Inference("no image loaded".to_string()))?;
        let generation = self.store.generation();
        let detector = self.detector.clone();
        self.detect_task = Some(tokio::spawn(async move {
            let regions = detector.detect(&base).await?;
            debug!("detector returned {} regions", regions.len());
            let objects = extract_regions(&base, &regions).await;
            Ok(DetectionRun {
                generation,
                objects,
            })
        }));
        Ok(())
    }

    /// Join the in-flight run and publish it to the scene. Returns `false`
    /// when there was nothing to publish: no run in flight, a cancelled run,
    /// or a run started against a previous image.
    pub async fn finish_detection(&mut self) -> Result<bool, RestageError> {
        let Some(task) = self.detect_task.take() else {
            return Ok(false);
        };
        match task.await {
            Ok(Ok(run)) => Ok(self.store.populate(run.generation, run.objects)),
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Ok(false),
            Err(e) => Err(RestageError::Inference(format!(
                "detection task failed: {e}"
            ))),
        }
    }

    /// Run a full detection pass and report how many objects the scene now
    /// holds. Convenience for non-interactive callers.
    pub async fn detect_objects(&mut self) -> Result<usize, RestageError> {
        self.start_detection()?;
        self.finish_detection().await?;
        Ok(self.store.objects().len())
    }

    pub fn move_object(&mut self, id: Uuid, new_x: f32, new_y: f32) -> Result<(), RestageError> {
        self.store.move_object(id, new_x, new_y)
    }

    pub fn delete_object(&mut self, id: Uuid) -> Result<(), RestageError> {
        self.store.delete_object(id)
    }

    /// Flatten the current scene for export. `None` until an image is
    /// loaded.
    pub fn composite(&self) -> Option<RgbaImage> {
        let base = self.base.as_ref()?;
        Some(self.compositor.composite(base, &self.store))
    }
}
