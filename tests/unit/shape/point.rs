use super::*;

fn keyed_point(x: f64, y: f64) -> ControlPoint {
    let mut p = ControlPoint::new(false);
    p.set_position_at(FrameTime(0), x, y);
    p.set_left_at(FrameTime(0), x, y);
    p.set_right_at(FrameTime(0), x, y);
    p
}

#[test]
fn cusp_snaps_tangents_within_the_limit() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_left_at(FrameTime(0), 30.0, 40.0); // distance 50, right on the limit
    p.cusp_point(FrameTime(0), true, false);
    assert_eq!(p.left_at(FrameTime(0)).0, Point::new(0.0, 0.0));

    // already cusped points stay put
    p.cusp_point(FrameTime(0), true, false);
    assert_eq!(p.left_at(FrameTime(0)).0, Point::new(0.0, 0.0));
    assert_eq!(p.right_at(FrameTime(0)).0, Point::new(0.0, 0.0));
}

#[test]
fn cusp_pulls_far_tangents_a_quarter_closer() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_right_at(FrameTime(0), 100.0, 0.0);
    p.cusp_point(FrameTime(0), true, false);
    assert_eq!(p.right_at(FrameTime(0)).0, Point::new(75.0, 0.0));
}

#[test]
fn cusp_without_keyframe_or_auto_keying_is_ignored() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_right_at(FrameTime(0), 100.0, 0.0);
    // time 5 holds no keyframe, so nothing may be written
    p.cusp_point(FrameTime(5), false, false);
    assert_eq!(p.right_at(FrameTime(5)).0, Point::new(100.0, 0.0));
    assert_eq!(p.keyframes_count(), 1);
}

#[test]
fn smooth_grows_separated_tangents() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_right_at(FrameTime(0), 8.0, 0.0);
    p.smooth_point(FrameTime(0), None, None, true, false);
    assert_eq!(p.right_at(FrameTime(0)).0, Point::new(10.0, 0.0));
}

#[test]
fn smooth_builds_tangents_along_the_curve_bisector() {
    // three collinear points on the x axis: smoothing the middle one must
    // produce horizontal tangents of length 50
    let prev = keyed_point(-10.0, 0.0);
    let next = keyed_point(10.0, 0.0);
    let mut p = keyed_point(0.0, 0.0);
    p.smooth_point(FrameTime(0), Some(&prev), Some(&next), true, false);

    let left = p.left_at(FrameTime(0)).0;
    let right = p.right_at(FrameTime(0)).0;
    assert!((left.x - 50.0).abs() < 1e-9, "left = {left:?}");
    assert!(left.y.abs() < 1e-9);
    assert!((right.x - -50.0).abs() < 1e-9, "right = {right:?}");
    assert!(right.y.abs() < 1e-9);
}

#[test]
fn smooth_leaves_a_lone_point_untouched() {
    let mut p = keyed_point(3.0, 3.0);
    p.smooth_point(FrameTime(0), None, None, true, false);
    assert_eq!(p.left_at(FrameTime(0)).0, Point::new(3.0, 3.0));
    assert_eq!(p.right_at(FrameTime(0)).0, Point::new(3.0, 3.0));
}

#[test]
fn ripple_edit_writes_every_keyframe() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_position_at(FrameTime(10), 0.0, 0.0);
    p.set_left_at(FrameTime(10), 0.0, 0.0);
    p.set_right_at(FrameTime(10), 200.0, 0.0);

    p.set_right_at(FrameTime(0), 100.0, 0.0);
    p.cusp_point(FrameTime(0), true, true);
    // the time-0 result is repeated verbatim at time 10
    assert_eq!(p.right_at(FrameTime(10)).0, Point::new(75.0, 0.0));
}

#[test]
fn equals_at_time_compares_all_three_channels() {
    let a = keyed_point(1.0, 2.0);
    let mut b = keyed_point(1.0, 2.0);
    assert!(a.equals_at_time(FrameTime(0), &b));
    b.set_right_at(FrameTime(0), 9.0, 9.0);
    assert!(!a.equals_at_time(FrameTime(0), &b));
}

#[test]
fn nearby_tangent_prefers_the_left_side() {
    let mut p = keyed_point(0.0, 0.0);
    p.set_left_at(FrameTime(0), 5.0, 5.0);
    p.set_right_at(FrameTime(0), 5.0, 5.0);
    assert_eq!(
        p.is_nearby_tangent(FrameTime(0), 5.0, 5.0, 1.0),
        Some(TangentSide::Left)
    );
    p.set_left_at(FrameTime(0), -5.0, -5.0);
    assert_eq!(
        p.is_nearby_tangent(FrameTime(0), 5.0, 5.0, 1.0),
        Some(TangentSide::Right)
    );
    assert_eq!(p.is_nearby_tangent(FrameTime(0), 50.0, 0.0, 1.0), None);
}

#[test]
fn last_keyframe_removal_keeps_the_evaluated_pose() {
    let mut p = keyed_point(4.0, 5.0);
    p.remove_keyframe(FrameTime(0));
    assert_eq!(p.keyframes_count(), 0);
    assert_eq!(p.position_at(FrameTime(0)).0, Point::new(4.0, 5.0));
}
