use image::DynamicImage;
use uuid::Uuid;

/// Bounding box produced by the detector, in source-raster pixel space.
/// `width`/`height` are extents, not second-corner coordinates.
#[derive(Debug, Clone)]
pub struct DetectedRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    pub score: f32,
}

impl DetectedRegion {
    /// Clamp the region rectangle to raster bounds, returning integer
    /// `(x, y, width, height)`. `None` means the region has no area left
    /// after clamping and should be skipped.
    pub fn clamp_to(&self, bounds_width: u32, bounds_height: u32) -> Option<(u32, u32, u32, u32)> {
        if bounds_width == 0 || bounds_height == 0 {
            return None;
        }
        let x0 = self.x.clamp(0.0, bounds_width as f32);
        let y0 = self.y.clamp(0.0, bounds_height as f32);
        let x1 = (self.x + self.width).clamp(0.0, bounds_width as f32);
        let y1 = (self.y + self.height).clamp(0.0, bounds_height as f32);

        let x = x0.round() as u32;
        let y = y0.round() as u32;
        if x >= bounds_width || y >= bounds_height {
            return None;
        }
        let width = ((x1 - x0).round() as u32).min(bounds_width - x);
        let height = ((y1 - y0).round() as u32).min(bounds_height - y);
        if width == 0 || height == 0 {
            return None;
        }
        Some((x, y, width, height))
    }
}

/// A detected object lifted out of the base raster and placeable on the
/// scene. `x`/`y` track the current placement; `original_x`/`original_y`
/// record where the crop came from and never change afterwards.
#[derive(Debug, Clone)]
pub struct OverlayObject {
    /// Stable for the object's lifetime; shared with any ghost marker
    /// shadowing it.
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
    /// Exclusively owned copy of the source pixels under the region.
    pub cropped: DynamicImage,
    pub original_x: f32,
    pub original_y: f32,
    pub label: String,
}

/// Why a ghost marker was left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostCause {
    /// The object was dragged away from its original position.
    Relocated,
    /// The object was deleted from the scene.
    Removed,
}

/// Placeholder drawn where an object used to be. Always anchored at the
/// object's original coordinates, regardless of where it was dragged.
#[derive(Debug, Clone)]
pub struct GhostMarker {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub width: u32,
    pub height: u32,
    pub cause: GhostCause,
}
