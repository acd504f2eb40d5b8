use super::*;

use crate::foundation::core::Point;
use crate::timeline::FrameTimeline;

fn test_context() -> RotoContext {
    RotoContext::new(Arc::new(FrameTimeline::new(FrameTime(0))))
}

fn sample_project() -> RotoContext {
    let ctx = test_context();
    let group = ctx.add_layer();
    group.set_name("mattes");

    let b = ctx.make_bezier(0.0, 0.0, "Bezier").unwrap();
    b.add_control_point(10.0, 0.0).unwrap();
    b.add_control_point(10.0, 10.0).unwrap();
    b.set_finished(true);
    b.move_point_by_index(0, FrameTime(5), 2.0, 2.0).unwrap();
    b.opacity_knob().set_value(0.5);
    b.feather_knob().set_value(12);
    b.set_overlay_color([0.1, 0.2, 0.3, 1.0]);
    ctx.link_bezier_to_context_knobs(&b);
    ctx.set_ripple_edit_enabled(true);
    ctx
}

#[test]
fn save_walks_the_whole_tree() {
    let ctx = sample_project();
    let record = ctx.save();
    assert!(record.ripple_edit);
    assert_eq!(record.base_layer.name, "Layer 1");
    assert_eq!(record.base_layer.children.len(), 2);
    assert_eq!(record.selected_items, vec!["Bezier 1".to_string()]);

    let Some(ItemRecord::Bezier(shape)) = record
        .base_layer
        .children
        .iter()
        .find(|c| matches!(c, ItemRecord::Bezier(_)))
    else {
        panic!("bezier child missing from the base layer record");
    };
    assert!(shape.closed);
    assert_eq!(shape.control_points.len(), 3);
    assert_eq!(shape.feather_points.len(), 3);
    assert_eq!(shape.control_points[0].keys.len(), 2);
    assert_eq!(shape.feather.value, 12);
}

#[test]
fn json_round_trip_preserves_the_project() {
    let ctx = sample_project();
    let json = ctx.save_to_json().unwrap();

    let restored = test_context();
    restored.load_from_json(&json).unwrap();

    assert!(restored.is_ripple_edit_enabled());
    assert!(restored.get_layer_by_name("mattes").is_some());

    let Some(RotoItem::Bezier(b)) = restored.get_item_by_name("Bezier 1") else {
        panic!("shape missing after load");
    };
    assert!(b.is_finished());
    assert_eq!(b.control_points_count(), 3);
    assert_eq!(b.opacity(FrameTime(0)), 0.5);
    assert_eq!(b.feather_distance(FrameTime(0)), 12);
    assert_eq!(b.overlay_color(), [0.1, 0.2, 0.3, 1.0]);

    // the keyed move survives with both its keyframes
    assert_eq!(b.keyframe_times(), vec![FrameTime(0), FrameTime(5)]);
    let p = b.control_point_at(0).unwrap();
    assert_eq!(p.position_at(FrameTime(5)).0, Point::new(2.0, 2.0));
    assert_eq!(p.position_at(FrameTime(0)).0, Point::new(0.0, 0.0));

    // the saved selection is relinked against the context knobs
    assert_eq!(restored.selected_items().len(), 1);
    assert!(b.opacity_knob().is_slaved());
}

#[test]
fn load_requires_a_fresh_context() {
    let ctx = sample_project();
    let record = ctx.save();
    assert!(matches!(
        ctx.load(&record),
        Err(RotoError::Validation(_))
    ));
}

#[test]
fn mismatched_point_lists_drop_the_shape_outline() {
    let ctx = sample_project();
    let mut record = ctx.save();
    if let Some(ItemRecord::Bezier(shape)) = record
        .base_layer
        .children
        .iter_mut()
        .find(|c| matches!(c, ItemRecord::Bezier(_)))
    {
        shape.feather_points.pop();
    }

    let restored = test_context();
    restored.load(&record).unwrap();
    let Some(RotoItem::Bezier(b)) = restored.get_item_by_name("Bezier 1") else {
        panic!("shape missing after load");
    };
    assert_eq!(b.control_points_count(), 0);
}

#[test]
fn unknown_selected_names_are_skipped() {
    let ctx = sample_project();
    let mut record = ctx.save();
    record.selected_items.push("ghost".to_string());

    let restored = test_context();
    restored.load(&record).unwrap();
    assert_eq!(restored.selected_items().len(), 1);
}
