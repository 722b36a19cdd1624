//! Detect objects in an image, restage or remove them, and flatten the
//! edited scene into one exportable raster.
//!
//! The pipeline: decode a bitmap, run object detection over it, lift each
//! detected region out as an independently owned crop, let the caller move
//! or delete those objects (leaving ghost markers where they used to be),
//! then composite everything back into a single image for export.

pub mod compositor;
pub mod detector;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod loader;
pub mod models;
pub mod overlay;
pub mod session;

pub use compositor::SceneCompositor;
pub use detector::{DetectionModel, ObjectDetector, OnnxModel};
pub use error::RestageError;
pub use exporter::{ImageStore, StoreReceipt, StoredImage};
pub use extractor::extract_regions;
pub use loader::decode_image;
pub use models::{DetectedRegion, GhostCause, GhostMarker, OverlayObject};
pub use overlay::{Generation, OverlayStore};
pub use session::EditorSession;
