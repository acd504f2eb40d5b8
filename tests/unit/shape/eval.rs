use super::*;

fn static_point(x: f64, y: f64) -> ControlPoint {
    let mut p = ControlPoint::new(false);
    p.set_static_position(x, y);
    p.set_static_left(x, y);
    p.set_static_right(x, y);
    p
}

#[test]
fn de_casteljau_hits_the_endpoints() {
    let p0 = Point::new(0.0, 0.0);
    let p1 = Point::new(0.0, 10.0);
    let p2 = Point::new(10.0, 10.0);
    let p3 = Point::new(10.0, 0.0);
    assert_eq!(bezier_point(p0, p1, p2, p3, 0.0), p0);
    assert_eq!(bezier_point(p0, p1, p2, p3, 1.0), p3);
}

#[test]
fn degenerate_segment_evaluates_as_a_line() {
    // coincident tangents collapse the cubic onto the chord
    let p0 = Point::new(0.0, 0.0);
    let p3 = Point::new(10.0, 0.0);
    let mid = bezier_point(p0, p0, p3, p3, 0.5);
    assert_eq!(mid, Point::new(5.0, 0.0));
}

#[test]
fn eval_scales_controls_by_the_mipmap_level() {
    let first = static_point(0.0, 0.0);
    let last = static_point(8.0, 16.0);

    let mut full = Vec::new();
    eval_bezier_segment(&first, &last, FrameTime(0), 0, 50, &mut full, None);
    let mut half = Vec::new();
    eval_bezier_segment(&first, &last, FrameTime(0), 1, 50, &mut half, None);

    assert_eq!(full.len(), half.len());
    let last_full = full[full.len() - 1];
    let last_half = half[half.len() - 1];
    assert!((last_half.x - last_full.x / 2.0).abs() < 1e-9);
    assert!((last_half.y - last_full.y / 2.0).abs() < 1e-9);
}

#[test]
fn bounds_right_edge_is_one_past_the_samples() {
    let mut bounds = BoundsAccumulator::new();
    let first = static_point(2.0, 3.0);
    let last = static_point(6.0, 9.0);
    let mut pts = Vec::new();
    eval_bezier_segment(&first, &last, FrameTime(0), 0, 10, &mut pts, Some(&mut bounds));
    let r = bounds.finish();
    assert_eq!(r.x0, 2.0);
    assert_eq!(r.y0, 3.0);
    assert!((r.x1 - 7.0).abs() < 1e-9, "x1 = {}", r.x1);
    assert!((r.y1 - 9.0).abs() < 1e-9, "y1 = {}", r.y1);
}

#[test]
fn empty_bounds_finish_as_a_unit_box() {
    let r = BoundsAccumulator::new().finish();
    assert_eq!(r, kurbo::Rect::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn point_on_segment_reports_the_parameter() {
    let first = static_point(0.0, 0.0);
    let last = static_point(10.0, 0.0);
    let t = is_point_on_segment(&first, &last, FrameTime(0), 5.0, 0.2, 1.0).unwrap();
    assert!((t - 0.5).abs() < 0.05, "t = {t}");
    assert!(is_point_on_segment(&first, &last, FrameTime(0), 5.0, 3.0, 1.0).is_none());
}

#[test]
fn segments_differ_checks_positions_then_tangents() {
    let a0 = static_point(0.0, 0.0);
    let a1 = static_point(10.0, 0.0);
    let mut b0 = static_point(0.0, 0.0);
    let b1 = static_point(10.0, 0.0);
    assert!(!segments_differ(FrameTime(0), &a0, &a1, &b0, &b1));
    b0.set_static_right(3.0, 4.0);
    assert!(segments_differ(FrameTime(0), &a0, &a1, &b0, &b1));
}

#[test]
fn derivatives_degrade_with_coincident_controls() {
    // fully degenerate: a straight chord, derivative is the chord itself
    let prev = static_point(0.0, 0.0);
    let p = static_point(10.0, 0.0);
    assert_eq!(left_derivative_at(FrameTime(0), &p, &prev), Vec2::new(10.0, 0.0));
    assert_eq!(right_derivative_at(FrameTime(0), &prev, &p), Vec2::new(10.0, 0.0));

    // full cubic
    let mut prev = static_point(0.0, 0.0);
    prev.set_static_right(1.0, 2.0);
    let mut p = static_point(10.0, 0.0);
    p.set_static_left(8.0, 3.0);
    assert_eq!(
        left_derivative_at(FrameTime(0), &p, &prev),
        Vec2::new(3.0 * (10.0 - 8.0), 3.0 * (0.0 - 3.0))
    );
    assert_eq!(
        right_derivative_at(FrameTime(0), &prev, &p),
        Vec2::new(3.0 * (1.0 - 0.0), 3.0 * (2.0 - 0.0))
    );
}

#[test]
fn quadratic_derivative_substitutes_the_shared_control() {
    // p0 == p1 drops the degree to two
    let prev = static_point(0.0, 0.0);
    let mut p = static_point(10.0, 0.0);
    p.set_static_left(6.0, 4.0);
    assert_eq!(
        left_derivative_at(FrameTime(0), &p, &prev),
        Vec2::new(2.0 * (10.0 - 6.0), 2.0 * (0.0 - 4.0))
    );
}
