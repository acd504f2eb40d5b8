use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::RotoContext;
use crate::foundation::core::{FrameTime, RectI};
use crate::render::cache::MaskKey;
use crate::render::image::MaskImage;
use crate::render::scanline::fill_polygon_even_odd;

impl RotoContext {
    /// Render the alpha mask of every activated, finished shape at `time`.
    ///
    /// The raster covers the union of the shapes' region of definition and
    /// `node_rod`, and is cached under a key derived from `node_hash` and
    /// `age_to_render`; `bypass_cache` forces a cached raster to be
    /// recomputed in place. Shapes fill front to back with their opacity,
    /// inverted shapes pre-fill the whole raster and then carve out
    /// `1 - opacity`. Only pixels inside `roi` (clipped to the raster) are
    /// written.
    ///
    /// `abort` is polled once per scanline. An aborted render evicts its
    /// cache entry and returns the partial raster with nothing marked
    /// rendered; a completed render marks the clipped region.
    #[tracing::instrument(
        level = "debug",
        skip(self, abort),
        fields(time = time.0, mip = mip_map_level, age = age_to_render)
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn render_mask(
        &self,
        roi: RectI,
        node_hash: u64,
        age_to_render: u64,
        node_rod: RectI,
        time: FrameTime,
        view: u32,
        mip_map_level: u32,
        bypass_cache: bool,
        abort: &AtomicBool,
    ) -> Arc<MaskImage> {
        let splines = self.curves_by_render_order();

        // a hash distinct from the node's own, so the mask and the node
        // output never collide in the cache
        let key = MaskKey::new(node_hash, age_to_render, time, mip_map_level, view);

        let mut did_initialize_inverted = false;
        let (image, was_cached) = self.core.cache.get_or_insert_with(key, || {
            let rod = self.mask_region_of_definition(time).merge(node_rod);
            MaskImage::new(rod, 1)
        });

        if was_cached {
            if bypass_cache {
                // zero the bitmap so the whole region is recomputed while
                // still going through the cache
                image.clear_rendered_bitmap();
            }
        } else if splines.len() == 1 {
            // a single inverted shape can render straight over its own
            // pre-fill, saving one pass over the raster
            let curve = &splines[0];
            if curve.is_finished() && curve.is_activated(time) && curve.inverted(time) {
                did_initialize_inverted = true;
                image.default_initialize(0.0, curve.opacity(time) as f32);
            }
        }

        let clipped_roi = roi.intersect(image.rod());

        for (i, spline) in splines.iter().enumerate() {
            if !spline.is_finished() || !spline.is_activated(time) {
                continue;
            }
            let points = spline.evaluate_at_time(time, mip_map_level, 100);
            let opacity = spline.opacity(time);
            let inverted = spline.inverted(time);

            let pre_fill_invert = inverted && (i != 0 || !did_initialize_inverted);
            if pre_fill_invert {
                image.fill(image.rod(), 0.0, opacity as f32);
            }

            let value = if inverted { 1.0 - opacity } else { opacity };
            if !fill_polygon_even_odd(clipped_roi, &points, value as f32, &image, abort) {
                break;
            }
        }

        if abort.load(Ordering::Relaxed) {
            // the raster holds garbage, drop it from the cache
            self.core.cache.remove(&key);
            tracing::debug!("mask render aborted, evicted partial raster");
        } else {
            image.mark_rendered(clipped_roi);
        }
        image
    }

    /// The shared mask cache.
    pub fn mask_cache(&self) -> &crate::render::cache::MaskCache {
        &self.core.cache
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mask.rs"]
mod tests;
