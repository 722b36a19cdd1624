//! Deterministic scene flattening.
//!
//! Render order is fixed: base raster, then ghost markers in insertion
//! order, then live overlay objects in insertion order. The same scene
//! always produces the same pixels.

use image::{
    DynamicImage, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::models::{GhostCause, GhostMarker, OverlayObject};
use crate::overlay::OverlayStore;

/// Export supersampling factor: the flattened raster is rendered at three
/// times the interactive resolution.
const EXPORT_PIXEL_RATIO: u32 = 3;

/// Fill tone for a marker left by a drag.
const RELOCATED_FILL: Rgba<u8> = Rgba([0, 128, 0, 255]);
/// Fill tone for a marker left by a delete.
const REMOVED_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GHOST_OPACITY: f32 = 0.4;

const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
const OUTLINE_STROKE: u32 = 4;
const DASH_ON: u32 = 10;
const DASH_OFF: u32 = 5;

const DELETE_FILL: Rgba<u8> = Rgba([255, 0, 0, 255]);
const DELETE_OPACITY: f32 = 0.7;
const DELETE_GAP: u32 = 5;
const DELETE_WIDTH: u32 = 50;
const DELETE_HEIGHT: u32 = 30;

/// Flattens a scene into one exportable raster.
pub struct SceneCompositor {
    pixel_ratio: u32,
}

impl SceneCompositor {
    /// `pixel_ratio` multiplies the output resolution. Ratios below 1 are
    /// treated as 1; at 1 the base raster is copied through untouched.
    pub fn new(pixel_ratio: u32) -> Self {
        Self {
            pixel_ratio: pixel_ratio.max(1),
        }
    }

    pub fn pixel_ratio(&self) -> u32 {
        self.pixel_ratio
    }

    /// Flatten base + markers + objects into one raster. The result is a
    /// snapshot: later scene mutations do not affect it.
    pub fn composite(&self, base: &DynamicImage, store: &OverlayStore) -> RgbaImage {
        let ratio = self.pixel_ratio;
        let mut canvas = if ratio == 1 {
            base.to_rgba8()
        } else {
            imageops::resize(
                &base.to_rgba8(),
                base.width() * ratio,
                base.height() * ratio,
                FilterType::CatmullRom,
            )
        };

        for marker in store.markers() {
            self.draw_marker(&mut canvas, marker);
        }
        for object in store.objects() {
            self.draw_object(&mut canvas, object);
        }
        canvas
    }

    fn draw_marker(&self, canvas: &mut RgbaImage, marker: &GhostMarker) {
        let fill = match marker.cause {
            GhostCause::Relocated => RELOCATED_FILL,
            GhostCause::Removed => REMOVED_FILL,
        };
        fill_rect_blend(
            canvas,
            self.scaled(marker.x),
            self.scaled(marker.y),
            marker.width * self.pixel_ratio,
            marker.height * self.pixel_ratio,
            fill,
            GHOST_OPACITY,
        );
    }

    fn draw_object(&self, canvas: &mut RgbaImage, object: &OverlayObject) {
        let ratio = self.pixel_ratio;
        let x = self.scaled(object.x);
        let y = self.scaled(object.y);
        let width = object.width * ratio;
        let height = object.height * ratio;

        let sprite = object.cropped.to_rgba8();
        if ratio == 1 {
            imageops::overlay(canvas, &sprite, x, y);
        } else {
            let scaled = imageops::resize(&sprite, width, height, FilterType::CatmullRom);
            imageops::overlay(canvas, &scaled, x, y);
        }

        self.draw_dashed_outline(canvas, x, y, width, height);

        fill_rect_blend(
            canvas,
            x + (width + DELETE_GAP * ratio) as i64,
            y,
            DELETE_WIDTH * ratio,
            DELETE_HEIGHT * ratio,
            DELETE_FILL,
            DELETE_OPACITY,
        );
    }

    /// Dashed rectangle outline, stroke centered on the edges.
    fn draw_dashed_outline(&self, canvas: &mut RgbaImage, x: i64, y: i64, width: u32, height: u32) {
        let ratio = self.pixel_ratio;
        let stroke = OUTLINE_STROKE * ratio;
        let on = (DASH_ON * ratio) as i64;
        let period = on + (DASH_OFF * ratio) as i64;
        let half = (stroke / 2) as i64;

        let right = x + width as i64;
        let bottom = y + height as i64;

        let mut sx = x;
        while sx < right {
            let len = on.min(right - sx) as u32;
            solid_rect(canvas, sx, y - half, len, stroke, OUTLINE_COLOR);
            solid_rect(canvas, sx, bottom - half, len, stroke, OUTLINE_COLOR);
            sx += period;
        }
        let mut sy = y;
        while sy < bottom {
            let len = on.min(bottom - sy) as u32;
            solid_rect(canvas, x - half, sy, stroke, len, OUTLINE_COLOR);
            solid_rect(canvas, right - half, sy, stroke, len, OUTLINE_COLOR);
            sy += period;
        }
    }

    fn scaled(&self, v: f32) -> i64 {
        (v * self.pixel_ratio as f32).round() as i64
    }
}

impl Default for SceneCompositor {
    fn default() -> Self {
        Self::new(EXPORT_PIXEL_RATIO)
    }
}

fn solid_rect(canvas: &mut RgbaImage, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    draw_filled_rect_mut(
        canvas,
        Rect::at(x as i32, y as i32).of_size(width, height),
        color,
    );
}

/// Blend a filled rectangle over the canvas at the given opacity, clipped to
/// the canvas bounds. The alpha channel is left as-is.
fn fill_rect_blend(
    canvas: &mut RgbaImage,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    fill: Rgba<u8>,
    opacity: f32,
) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    let x0 = x.clamp(0, canvas_width as i64) as u32;
    let y0 = y.clamp(0, canvas_height as i64) as u32;
    let x1 = (x + width as i64).clamp(0, canvas_width as i64) as u32;
    let y1 = (y + height as i64).clamp(0, canvas_height as i64) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = canvas.get_pixel_mut(px, py);
            for channel in 0..3 {
                pixel[channel] = (pixel[channel] as f32 * (1.0 - opacity)
                    + fill[channel] as f32 * opacity)
                    .round() as u8;
            }
        }
    }
}
