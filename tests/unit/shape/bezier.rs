use super::*;

use crate::context::RotoContext;
use crate::timeline::FrameTimeline;

fn test_context() -> RotoContext {
    RotoContext::new(Arc::new(FrameTimeline::new(FrameTime(0))))
}

fn square(ctx: &RotoContext) -> Arc<Bezier> {
    let b = ctx.make_bezier(0.0, 0.0, "Square").unwrap();
    b.add_control_point(10.0, 0.0).unwrap();
    b.add_control_point(10.0, 10.0).unwrap();
    b.add_control_point(0.0, 10.0).unwrap();
    b.set_finished(true);
    b
}

#[test]
fn feather_list_always_pairs_with_control_points() {
    let ctx = test_context();
    let b = square(&ctx);
    assert_eq!(b.control_points_count(), 4);
    for i in 0..4 {
        assert!(b.control_point_at(i).is_some());
        assert!(b.feather_point_at(i).is_some());
    }

    b.insert_control_point_after_index(0, 0.5).unwrap();
    assert_eq!(b.control_points_count(), 5);
    assert!(b.feather_point_at(4).is_some());

    b.remove_control_point_by_index(2).unwrap();
    assert_eq!(b.control_points_count(), 4);
    assert!(b.feather_point_at(3).is_some());
    assert!(b.feather_point_at(4).is_none());
}

#[test]
fn points_added_with_auto_keying_share_the_first_keyframe_time() {
    let ctx = test_context();
    let b = ctx.make_bezier(0.0, 0.0, "Square").unwrap();
    b.add_control_point(5.0, 5.0).unwrap();
    let first = b.control_point_at(0).unwrap();
    let second = b.control_point_at(1).unwrap();
    assert_eq!(first.keyframe_times(), vec![FrameTime(0)]);
    assert_eq!(second.keyframe_times(), vec![FrameTime(0)]);
}

#[test]
fn adding_to_a_finished_shape_fails() {
    let ctx = test_context();
    let b = square(&ctx);
    assert!(matches!(
        b.add_control_point(1.0, 1.0),
        Err(RotoError::Validation(_))
    ));
}

#[test]
fn insert_splits_the_segment_in_place() {
    let ctx = test_context();
    let b = square(&ctx);
    // the bottom edge runs (0,0) -> (10,0) with coincident tangents
    b.insert_control_point_after_index(0, 0.5).unwrap();

    let inserted = b.control_point_at(1).unwrap();
    assert_eq!(inserted.position_at(FrameTime(0)).0, Point::new(5.0, 0.0));
    assert_eq!(inserted.left_at(FrameTime(0)).0, Point::new(2.5, 0.0));
    assert_eq!(inserted.right_at(FrameTime(0)).0, Point::new(7.5, 0.0));

    // surrounding tangents shorten to the first-level lerps
    let prev = b.control_point_at(0).unwrap();
    let next = b.control_point_at(2).unwrap();
    assert_eq!(prev.right_at(FrameTime(0)).0, Point::new(0.0, 0.0));
    assert_eq!(next.left_at(FrameTime(0)).0, Point::new(10.0, 0.0));
}

#[test]
fn insert_after_the_last_point_of_an_open_curve_fails() {
    let ctx = test_context();
    let b = ctx.make_bezier(0.0, 0.0, "Open").unwrap();
    b.add_control_point(10.0, 0.0).unwrap();
    assert!(matches!(
        b.insert_control_point_after_index(1, 0.5),
        Err(RotoError::IndexOutOfRange { index: 1, len: 2 })
    ));
    assert!(matches!(
        b.insert_control_point_after_index(7, 0.5),
        Err(RotoError::IndexOutOfRange { .. })
    ));
}

#[test]
fn move_point_drags_the_linked_feather_point() {
    let ctx = test_context();
    let b = square(&ctx);
    b.move_point_by_index(0, FrameTime(0), 2.0, 3.0).unwrap();

    let cp = b.control_point_at(0).unwrap();
    let fp = b.feather_point_at(0).unwrap();
    assert_eq!(cp.position_at(FrameTime(0)).0, Point::new(2.0, 3.0));
    assert_eq!(fp.position_at(FrameTime(0)).0, Point::new(2.0, 3.0));
}

#[test]
fn unlinked_feather_point_stays_behind() {
    let ctx = test_context();
    ctx.set_feather_link_enabled(false);
    let b = square(&ctx);
    // once the feather point has been moved away it no longer coincides
    b.move_feather_by_index(0, FrameTime(0), 1.0, 0.0).unwrap();
    b.move_point_by_index(0, FrameTime(0), 5.0, 0.0).unwrap();

    let cp = b.control_point_at(0).unwrap();
    let fp = b.feather_point_at(0).unwrap();
    assert_eq!(cp.position_at(FrameTime(0)).0, Point::new(5.0, 0.0));
    assert_eq!(fp.position_at(FrameTime(0)).0, Point::new(1.0, 0.0));
}

#[test]
fn moves_without_keyframe_or_auto_keying_are_dropped() {
    let ctx = test_context();
    ctx.set_auto_keying_enabled(false);
    let b = ctx.make_bezier(0.0, 0.0, "Static").unwrap();
    // without auto-keying the point only has static values, and a move at a
    // non-keyed time must not invent a keyframe
    b.move_point_by_index(0, FrameTime(3), 5.0, 5.0).unwrap();
    assert_eq!(b.keyframes_count(), 0);
    assert_eq!(
        b.control_point_at(0).unwrap().position_at(FrameTime(3)).0,
        Point::new(0.0, 0.0)
    );
}

#[test]
fn tangent_moves_fall_back_to_statics_while_unkeyed() {
    let ctx = test_context();
    ctx.set_auto_keying_enabled(false);
    let b = ctx.make_bezier(0.0, 0.0, "Static").unwrap();
    b.move_right_bezier_point(0, FrameTime(0), 4.0, 0.0).unwrap();
    assert_eq!(b.keyframes_count(), 0);
    assert_eq!(
        b.control_point_at(0).unwrap().right_at(FrameTime(0)).0,
        Point::new(4.0, 0.0)
    );
    // the feather twin coincided, so it follows even with feather-link off
    assert_eq!(
        b.feather_point_at(0).unwrap().right_at(FrameTime(0)).0,
        Point::new(4.0, 0.0)
    );
}

#[test]
fn set_keyframe_is_idempotent_but_always_notifies() {
    let ctx = test_context();
    let notifications = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = notifications.clone();
    ctx.on_event(move |e| {
        if matches!(e, RotoEvent::KeyframeSet { .. }) {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let b = square(&ctx);
    let before = notifications.load(std::sync::atomic::Ordering::SeqCst);
    b.set_keyframe(FrameTime(0)).unwrap();
    b.set_keyframe(FrameTime(0)).unwrap();
    assert_eq!(b.keyframes_count(), 1);
    assert_eq!(
        notifications.load(std::sync::atomic::Ordering::SeqCst),
        before + 2
    );
}

#[test]
fn remove_keyframe_of_unkeyed_time_is_silent() {
    let ctx = test_context();
    let notifications = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = notifications.clone();
    ctx.on_event(move |e| {
        if matches!(e, RotoEvent::KeyframeRemoved { .. }) {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let b = square(&ctx);
    b.remove_keyframe(FrameTime(99)).unwrap();
    assert_eq!(notifications.load(std::sync::atomic::Ordering::SeqCst), 0);

    b.remove_keyframe(FrameTime(0)).unwrap();
    assert_eq!(b.keyframes_count(), 0);
    assert_eq!(notifications.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn keyframe_navigation_is_strict() {
    let ctx = test_context();
    let b = square(&ctx);
    b.set_keyframe(FrameTime(10)).unwrap();
    b.set_keyframe(FrameTime(20)).unwrap();

    assert_eq!(b.previous_keyframe_time(FrameTime(10)), Some(FrameTime(0)));
    assert_eq!(b.next_keyframe_time(FrameTime(10)), Some(FrameTime(20)));
    assert_eq!(b.previous_keyframe_time(FrameTime(0)), None);
    assert_eq!(b.next_keyframe_time(FrameTime(20)), None);
}

#[test]
fn hit_test_finds_the_bottom_edge_of_a_square() {
    let ctx = test_context();
    let b = square(&ctx);
    let hit = b.is_point_on_curve(5.0, 0.0, 0.5).unwrap().unwrap();
    assert_eq!(hit.index, 0);
    assert!(!hit.feather);
    assert!(b.is_point_on_curve(50.0, 50.0, 0.5).unwrap().is_none());
}

#[test]
fn hit_test_ignores_the_closing_segment_of_an_open_curve() {
    let ctx = test_context();
    let b = ctx.make_bezier(0.0, 0.0, "Open").unwrap();
    b.add_control_point(10.0, 0.0).unwrap();
    b.add_control_point(10.0, 10.0).unwrap();
    // the segment back from (10,10) to (0,0) does not exist while open
    assert!(b.is_point_on_curve(5.0, 5.0, 0.5).unwrap().is_none());
    assert!(b.is_point_on_curve(5.0, 0.0, 0.5).unwrap().is_some());
}

#[test]
fn single_point_hit_test_degenerates_to_a_box() {
    let ctx = test_context();
    let b = ctx.make_bezier(4.0, 4.0, "Dot").unwrap();
    let hit = b.is_point_on_curve(4.2, 3.9, 0.5).unwrap().unwrap();
    assert_eq!(hit.index, 0);
    assert!(b.is_point_on_curve(6.0, 6.0, 0.5).unwrap().is_none());
}

#[test]
fn nearby_control_point_reports_the_list() {
    let ctx = test_context();
    let b = square(&ctx);
    assert_eq!(
        b.is_nearby_control_point(10.0, 10.0, 0.5).unwrap(),
        Some((2, false))
    );
    b.move_feather_by_index(1, FrameTime(0), 3.0, 3.0).unwrap();
    assert_eq!(
        b.is_nearby_control_point(13.0, 3.0, 0.5).unwrap(),
        Some((1, true))
    );
    assert_eq!(b.is_nearby_control_point(99.0, 0.0, 0.5).unwrap(), None);
}

#[test]
fn rect_selection_deduplicates_indices() {
    let ctx = test_context();
    let b = square(&ctx);
    let hits = b
        .control_points_within_rect(-1.0, 11.0, -1.0, 11.0, 0.0, SelectionTarget::Both)
        .unwrap();
    // every index once, reported from the control point list
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|(_, feather)| !feather));

    let feather_only = b
        .control_points_within_rect(-1.0, 11.0, -1.0, 11.0, 0.0, SelectionTarget::FeatherPointsOnly)
        .unwrap();
    assert_eq!(feather_only.len(), 4);
    assert!(feather_only.iter().all(|(_, feather)| *feather));

    let corner = b
        .control_points_within_rect(9.0, 11.0, -1.0, 1.0, 0.0, SelectionTarget::ControlPointsOnly)
        .unwrap();
    assert_eq!(corner, vec![(1, false)]);
}

#[test]
fn open_curve_evaluation_stops_at_the_last_point() {
    let ctx = test_context();
    let b = ctx.make_bezier(0.0, 0.0, "Open").unwrap();
    b.add_control_point(10.0, 0.0).unwrap();
    b.add_control_point(10.0, 10.0).unwrap();

    let open = b.evaluate_at_time(FrameTime(0), 0, 10);
    b.set_finished(true);
    let closed = b.evaluate_at_time(FrameTime(0), 0, 10);
    // closing adds one more evaluated segment
    assert!(closed.len() > open.len());
}

#[test]
fn feather_evaluation_skips_identical_segments() {
    let ctx = test_context();
    let b = square(&ctx);
    assert!(b.evaluate_feather_points_at_time(FrameTime(0), 10).is_empty());

    b.move_feather_by_index(0, FrameTime(0), 0.0, -2.0).unwrap();
    assert!(!b.evaluate_feather_points_at_time(FrameTime(0), 10).is_empty());
}

#[test]
fn bounding_box_covers_both_outlines() {
    let ctx = test_context();
    let b = square(&ctx);
    let r = b.bounding_box(FrameTime(0));
    assert!(r.x0 <= 0.0 && r.y0 <= 0.0);
    assert!(r.x1 >= 10.0 && r.y1 >= 10.0);

    b.move_feather_by_index(0, FrameTime(0), -5.0, 0.0).unwrap();
    let r = b.bounding_box(FrameTime(0));
    assert!(r.x0 <= -5.0);
}

#[test]
fn cusp_and_smooth_apply_to_both_lists() {
    let ctx = test_context();
    let b = square(&ctx);
    b.set_right_bezier_point(0, FrameTime(0), 100.0, 0.0).unwrap();
    b.cusp_point_at_index(0, FrameTime(0)).unwrap();

    assert_eq!(
        b.control_point_at(0).unwrap().right_at(FrameTime(0)).0,
        Point::new(75.0, 0.0)
    );
    assert_eq!(
        b.feather_point_at(0).unwrap().right_at(FrameTime(0)).0,
        Point::new(75.0, 0.0)
    );

    b.smooth_point_at_index(1, FrameTime(0)).unwrap();
    let p1 = b.control_point_at(1).unwrap();
    assert_ne!(p1.left_at(FrameTime(0)).0, p1.position_at(FrameTime(0)).0);
}

#[test]
fn remove_feather_collapses_onto_the_control_point() {
    let ctx = test_context();
    let b = square(&ctx);
    b.move_feather_by_index(2, FrameTime(0), 4.0, 4.0).unwrap();
    b.remove_feather_at_index(2).unwrap();
    let cp = b.control_point_at(2).unwrap();
    let fp = b.feather_point_at(2).unwrap();
    assert!(cp.equals_at_time(FrameTime(0), &fp));
}

#[test]
fn shape_knobs_answer_at_any_time() {
    let ctx = test_context();
    let b = square(&ctx);
    assert!(b.is_activated(FrameTime(0)));
    assert_eq!(b.opacity(FrameTime(0)), 1.0);
    assert_eq!(b.feather_distance(FrameTime(0)), 0);
    assert_eq!(b.feather_falloff(FrameTime(0)), 1.0);
    assert!(!b.inverted(FrameTime(0)));

    b.set_globally_activated(false);
    assert!(!b.is_activated(FrameTime(0)));
}

#[test]
fn every_mutation_bumps_the_context_age() {
    let ctx = test_context();
    let b = square(&ctx);
    let age = ctx.age();
    b.move_point_by_index(0, FrameTime(0), 1.0, 1.0).unwrap();
    assert!(ctx.age() > age);
}
