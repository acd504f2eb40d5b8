use super::*;

use std::sync::atomic::AtomicBool;

use crate::timeline::FrameTimeline;
use crate::shape::bezier::Bezier;

fn test_context() -> RotoContext {
    RotoContext::new(Arc::new(FrameTimeline::new(FrameTime(0))))
}

fn triangle(ctx: &RotoContext) -> Arc<Bezier> {
    let b = ctx.make_bezier(1.0, 1.0, "Bezier").unwrap();
    b.add_control_point(8.0, 1.0).unwrap();
    b.add_control_point(1.0, 8.0).unwrap();
    b.set_finished(true);
    b
}

fn render(ctx: &RotoContext, roi: RectI, bypass: bool) -> Arc<MaskImage> {
    let abort = AtomicBool::new(false);
    ctx.render_mask(roi, 0x1234, ctx.age(), RectI::default(), FrameTime(0), 0, 0, bypass, &abort)
}

#[test]
fn mask_covers_the_shape_interior() {
    let ctx = test_context();
    triangle(&ctx);
    let roi = RectI::new(0, 0, 16, 16);
    let image = render(&ctx, roi, false);

    assert_eq!(image.alpha_at(2, 2), Some(1.0));
    assert_eq!(image.alpha_at(3, 3), Some(1.0));
    // upper right half of the box is outside the triangle
    assert_eq!(image.alpha_at(7, 6), Some(0.0));
    assert!(image.is_rendered(roi.intersect(image.rod())));
}

#[test]
fn unfinished_shapes_do_not_render() {
    let ctx = test_context();
    let b = ctx.make_bezier(1.0, 1.0, "Open").unwrap();
    b.add_control_point(8.0, 1.0).unwrap();
    b.add_control_point(1.0, 8.0).unwrap();

    let image = render(&ctx, RectI::new(0, 0, 16, 16), false);
    // the rod degenerates to the node rod since nothing is finished
    assert!(image.rod().is_null() || image.alpha_at(2, 2) != Some(1.0));
}

#[test]
fn same_age_hits_the_cache() {
    let ctx = test_context();
    triangle(&ctx);
    let roi = RectI::new(0, 0, 16, 16);
    let first = render(&ctx, roi, false);
    let second = render(&ctx, roi, false);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.mask_cache().len(), 1);
}

#[test]
fn edits_change_the_cache_key() {
    let ctx = test_context();
    let b = triangle(&ctx);
    let roi = RectI::new(0, 0, 16, 16);
    let first = render(&ctx, roi, false);

    b.move_point_by_index(0, FrameTime(0), 1.0, 0.0).unwrap();
    let second = render(&ctx, roi, false);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.mask_cache().len(), 2);
}

#[test]
fn bypass_clears_the_rendered_bitmap_before_rerendering() {
    let ctx = test_context();
    triangle(&ctx);
    let roi = RectI::new(0, 0, 4, 4);
    let first = render(&ctx, roi, false);
    let clipped = roi.intersect(first.rod());
    assert!(first.is_rendered(clipped));

    let wider = RectI::new(0, 0, 16, 16);
    let second = render(&ctx, wider, true);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(second.is_rendered(wider.intersect(second.rod())));
}

#[test]
fn inverted_shape_fills_the_outside() {
    let ctx = test_context();
    let b = triangle(&ctx);
    b.opacity_knob().set_value(0.75);
    b.inverted_knob().set_value(true);

    let image = render(&ctx, RectI::new(0, 0, 16, 16), false);
    // outside keeps the pre-fill, the interior is carved down
    assert_eq!(image.alpha_at(7, 6), Some(0.75));
    assert_eq!(image.alpha_at(2, 2), Some(0.25));
}

#[test]
fn aborted_renders_are_evicted_and_never_marked() {
    let ctx = test_context();
    triangle(&ctx);
    let roi = RectI::new(0, 0, 16, 16);
    let abort = AtomicBool::new(true);
    let image = ctx.render_mask(
        roi,
        0x1234,
        ctx.age(),
        RectI::default(),
        FrameTime(0),
        0,
        0,
        false,
        &abort,
    );
    assert!(!image.is_rendered(roi.intersect(image.rod())));
    assert!(ctx.mask_cache().is_empty());
}
