//! YOLOv8-family object detection backed by ONNX Runtime.
//!
//! The model's raw output is a `[1, 4 + C, N]` tensor: N box proposals, each
//! carrying center/extent coordinates in input space plus C class scores.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{DynamicImage, imageops::FilterType};
use log::debug;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::DetectionModel;
use super::labels::COCO_LABELS;
use crate::error::RestageError;
use crate::models::DetectedRegion;

/// Model input size (square).
const INPUT_SIZE: u32 = 640;
/// Proposals below this confidence never become regions.
const CONF_THRESHOLD: f32 = 0.45;
/// IoU threshold for non-maximum suppression.
const IOU_THRESHOLD: f32 = 0.45;

/// An ONNX detection session. `Session::run` needs exclusive access, so the
/// session sits behind a mutex and the model itself can be shared.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl OnnxModel {
    /// Standard cache location for the detection model,
    /// `~/.cache/restage/yolov8n.onnx`.
    pub fn default_model_path() -> Result<PathBuf, RestageError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| RestageError::Inference("cannot resolve home directory".to_string()))?;
        Ok(Path::new(&home).join(".cache/restage/yolov8n.onnx"))
    }

    pub fn load(model_path: &Path) -> Result<Self, RestageError> {
        if !model_path.exists() {
            return Err(RestageError::Inference(format!(
                "detection model not found at {}; place a YOLOv8 ONNX export there or pass --model",
                model_path.display()
            )));
        }
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(4))
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| RestageError::Inference(e.to_string()))?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl DetectionModel for OnnxModel {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedRegion>, RestageError> {
        let input = preprocess(image)?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs!["images" => input])
            .map_err(|e| RestageError::Inference(e.to_string()))?;
        let output = outputs.get("output0").ok_or_else(|| {
            RestageError::Inference("model produced no output0 tensor".to_string())
        })?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| RestageError::Inference(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
        if dims.len() != 3 || dims[1] <= 4 {
            return Err(RestageError::Inference(format!(
                "unexpected detector output shape {dims:?}"
            )));
        }
        let num_classes = dims[1] - 4;
        let num_proposals = dims[2];

        let scale_x = image.width() as f32 / INPUT_SIZE as f32;
        let scale_y = image.height() as f32 / INPUT_SIZE as f32;

        let candidates = decode_output(
            data,
            num_classes,
            num_proposals,
            scale_x,
            scale_y,
            image.width() as f32,
            image.height() as f32,
        );
        let kept = nms(candidates, IOU_THRESHOLD);
        debug!("{} proposals survived thresholding and NMS", kept.len());

        Ok(kept
            .into_iter()
            .map(|c| DetectedRegion {
                x: c.x,
                y: c.y,
                width: c.width,
                height: c.height,
                label: COCO_LABELS
                    .get(c.class)
                    .copied()
                    .unwrap_or("object")
                    .to_string(),
                score: c.score,
            })
            .collect())
    }
}

/// Resize to the model's square input and lay the pixels out as an NCHW
/// float tensor in [0, 1].
fn preprocess(image: &DynamicImage) -> Result<ort::value::DynValue, RestageError> {
    let resized = image::imageops::resize(
        &image.to_rgb8(),
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Triangle,
    );
    let raw = resized.as_raw();

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut tensor_data = vec![0f32; 3 * plane];
    for idx in 0..plane {
        tensor_data[idx] = raw[idx * 3] as f32 / 255.0;
        tensor_data[plane + idx] = raw[idx * 3 + 1] as f32 / 255.0;
        tensor_data[2 * plane + idx] = raw[idx * 3 + 2] as f32 / 255.0;
    }

    let tensor_shape = [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
    Ok(
        Tensor::from_array((tensor_shape, tensor_data.into_boxed_slice()))
            .map_err(|e| RestageError::Inference(e.to_string()))?
            .into_dyn(),
    )
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    class: usize,
    score: f32,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f32 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = (self.x + self.width).min(other.x + other.width);
        let iy1 = (self.y + self.height).min(other.y + other.height);
        let inter = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.width * self.height + other.width * other.height - inter;
        inter / union
    }
}

/// Turn the raw `[1, 4 + C, N]` output into thresholded candidates in source
/// pixel space. Data layout is column-major across attribute rows:
/// `data[attr * N + i]`.
fn decode_output(
    data: &[f32],
    num_classes: usize,
    num_proposals: usize,
    scale_x: f32,
    scale_y: f32,
    frame_width: f32,
    frame_height: f32,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for i in 0..num_proposals {
        let cx = data[i];
        let cy = data[num_proposals + i];
        let w = data[2 * num_proposals + i];
        let h = data[3 * num_proposals + i];

        let mut class = 0usize;
        let mut score = 0f32;
        for c in 0..num_classes {
            let s = data[(4 + c) * num_proposals + i];
            if s > score {
                class = c;
                score = s;
            }
        }
        if score < CONF_THRESHOLD {
            continue;
        }

        // (cx, cy, w, h) in input space → top-left + extents in frame space.
        let x0 = ((cx - w / 2.0) * scale_x).max(0.0);
        let y0 = ((cy - h / 2.0) * scale_y).max(0.0);
        let x1 = ((cx + w / 2.0) * scale_x).min(frame_width);
        let y1 = ((cy + h / 2.0) * scale_y).min(frame_height);
        if x1 <= x0 || y1 <= y0 {
            continue;
        }

        candidates.push(Candidate {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            class,
            score,
        });
    }
    candidates
}

/// Greedy per-class NMS: sort by confidence descending, suppress overlapping
/// boxes of the same class.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

    let mut kept: Vec<Candidate> = Vec::new();
    let mut suppressed = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        kept.push(candidates[i]);
        for j in (i + 1)..candidates.len() {
            if candidates[j].class == candidates[i].class
                && candidates[i].iou(&candidates[j]) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }
    kept
}
