use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the editing pipeline.
///
/// Decode and inference failures halt the pipeline for the current image and
/// leave the scene editable; persistence failures never touch in-memory edit
/// state, so the caller can retry without redoing edits.
#[derive(Debug, Error)]
pub enum RestageError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("object detection failed: {0}")]
    Inference(String),

    /// Bookkeeping contract violation: the named object does not exist (or
    /// was already removed). Debug builds assert; callers in release may
    /// treat the operation as a no-op.
    #[error("no overlay object with id {0}")]
    InvalidObjectReference(Uuid),

    #[error("persistence request failed: {0}")]
    Persistence(String),
}
