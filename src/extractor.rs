use std::sync::Arc;

use image::DynamicImage;
use log::warn;
use uuid::Uuid;

use crate::models::{DetectedRegion, OverlayObject};

/// Crop every detected region out of `source` into an independently owned
/// raster, assigning each a fresh id.
///
/// Crops are issued concurrently (they only read the shared source) and
/// joined in order, so the returned batch is complete and order-preserving:
/// output `i` corresponds to the `i`-th region that survived clamping.
/// Regions whose rectangle has no area after clamping are skipped rather
/// than failing the batch.
pub async fn extract_regions(
    source: &Arc<DynamicImage>,
    regions: &[DetectedRegion],
) -> Vec<OverlayObject> {
    let mut handles = Vec::with_capacity(regions.len());
    for region in regions {
        let source = Arc::clone(source);
        let region = region.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            extract_one(&source, &region)
        }));
    }

    let mut objects = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Some(object)) => objects.push(object),
            Ok(None) => {}
            Err(e) => warn!("region extraction task failed: {e}"),
        }
    }
    objects
}

fn extract_one(source: &DynamicImage, region: &DetectedRegion) -> Option<OverlayObject> {
    let (x, y, width, height) = region.clamp_to(source.width(), source.height())?;
    let cropped = source.crop_imm(x, y, width, height);
    Some(OverlayObject {
        id: Uuid::new_v4(),
        x: x as f32,
        y: y as f32,
        width,
        height,
        cropped,
        original_x: x as f32,
        original_y: y as f32,
        label: region.label.clone(),
    })
}
