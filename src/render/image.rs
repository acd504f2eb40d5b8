use std::sync::{Mutex, MutexGuard};

use crate::foundation::core::RectI;

/// Raw pixel storage of a mask, guarded by one lock for the whole buffer.
pub(crate) struct ImageBuffer {
    pub(crate) pixels: Vec<f32>,
    rendered: Vec<bool>,
}

/// A float raster covering a region of definition, with a per-pixel bitmap
/// tracking which pixels hold final values.
///
/// Masks render with a single alpha component; four-component images are
/// supported for callers that composite the mask into an RGBA buffer, in
/// which case the alpha lives in the fourth channel.
pub struct MaskImage {
    rod: RectI,
    comps: usize,
    data: Mutex<ImageBuffer>,
}

impl MaskImage {
    /// A zero-initialized image covering `rod` with `comps` channels per
    /// pixel (1 or 4).
    pub fn new(rod: RectI, comps: usize) -> Self {
        let n = rod.width() as usize * rod.height() as usize;
        Self {
            rod,
            comps,
            data: Mutex::new(ImageBuffer {
                pixels: vec![0.0; n * comps],
                rendered: vec![false; n],
            }),
        }
    }

    /// The region of definition the buffer covers.
    pub fn rod(&self) -> RectI {
        self.rod
    }

    /// Channels per pixel.
    pub fn components(&self) -> usize {
        self.comps
    }

    /// Fill `rect` (clipped to the region of definition) with `color` on
    /// the color channels and `alpha` on the alpha channel.
    pub fn fill(&self, rect: RectI, color: f32, alpha: f32) {
        let rect = rect.intersect(self.rod);
        let mut data = self.data.lock().expect("image lock");
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                let base = self.pixel_index(x, y) * self.comps;
                for c in 0..self.comps - 1 {
                    data.pixels[base + c] = color;
                }
                data.pixels[base + self.comps - 1] = alpha;
            }
        }
    }

    /// Fill the whole region of definition.
    pub fn default_initialize(&self, color: f32, alpha: f32) {
        self.fill(self.rod, color, alpha);
    }

    /// The alpha value at pixel `(x, y)`, `None` outside the region of
    /// definition.
    pub fn alpha_at(&self, x: i32, y: i32) -> Option<f32> {
        if !self.rod.contains(x, y) {
            return None;
        }
        let data = self.data.lock().expect("image lock");
        Some(data.pixels[self.pixel_index(x, y) * self.comps + self.comps - 1])
    }

    /// Mark every pixel of `rect` as holding its final value.
    pub fn mark_rendered(&self, rect: RectI) {
        let rect = rect.intersect(self.rod);
        let mut data = self.data.lock().expect("image lock");
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                let i = self.pixel_index(x, y);
                data.rendered[i] = true;
            }
        }
    }

    /// Whether every pixel of `rect` has been rendered.
    pub fn is_rendered(&self, rect: RectI) -> bool {
        let rect = rect.intersect(self.rod);
        let data = self.data.lock().expect("image lock");
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                if !data.rendered[self.pixel_index(x, y)] {
                    return false;
                }
            }
        }
        true
    }

    /// Forget all rendered marks, forcing the next render to recompute.
    pub fn clear_rendered_bitmap(&self) {
        let mut data = self.data.lock().expect("image lock");
        data.rendered.fill(false);
    }

    pub(crate) fn lock_buffer(&self) -> MutexGuard<'_, ImageBuffer> {
        self.data.lock().expect("image lock")
    }

    pub(crate) fn pixel_index(&self, x: i32, y: i32) -> usize {
        (y - self.rod.y1) as usize * self.rod.width() as usize + (x - self.rod.x1) as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
