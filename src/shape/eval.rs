use kurbo::{Point, Rect, Vec2};

use crate::foundation::core::FrameTime;
use crate::shape::point::ControlPoint;

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Cubic De Casteljau evaluation at parameter `t`.
pub(crate) fn bezier_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let p0p1 = lerp(p0, p1, t);
    let p1p2 = lerp(p1, p2, t);
    let p2p3 = lerp(p2, p3, t);
    let p0p1_p1p2 = lerp(p0p1, p1p2, t);
    let p1p2_p2p3 = lerp(p1p2, p2p3, t);
    lerp(p0p1_p1p2, p1p2_p2p3, t)
}

fn segment_controls(first: &ControlPoint, last: &ControlPoint, time: FrameTime) -> [Point; 4] {
    [
        first.position_at(time).0,
        first.right_at(time).0,
        last.left_at(time).0,
        last.position_at(time).0,
    ]
}

/// Grows around evaluated polygon samples, then finalizes into a [`Rect`].
///
/// The right edge tracks one past the rightmost sample while the top edge
/// tracks the topmost sample exactly; downstream rounding has always relied
/// on this asymmetry, so it is kept as is.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BoundsAccumulator {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl BoundsAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            x1: f64::from(i32::MAX),
            y1: f64::from(i32::MAX),
            x2: f64::from(i32::MIN),
            y2: f64::from(i32::MIN),
        }
    }

    fn add(&mut self, p: Point) {
        if p.x < self.x1 {
            self.x1 = p.x;
        }
        if p.x >= self.x2 {
            self.x2 = p.x + 1.0;
        }
        if p.y < self.y1 {
            self.y1 = p.y;
        }
        if p.y >= self.y2 {
            self.y2 = p.y;
        }
    }

    /// The accumulated box, degenerated to a unit box when no sample (or a
    /// zero-extent set of samples) was added.
    pub(crate) fn finish(self) -> Rect {
        let mut x1 = self.x1;
        let mut y1 = self.y1;
        let mut x2 = self.x2;
        let mut y2 = self.y2;
        if x1 == f64::from(i32::MAX) {
            x1 = 0.0;
        }
        if y1 == f64::from(i32::MAX) {
            y1 = 0.0;
        }
        if x2 == f64::from(i32::MIN) {
            x2 = 1.0;
        }
        if y2 == f64::from(i32::MIN) {
            y2 = 1.0;
        }
        if x2 <= x1 || y2 <= y1 {
            x2 = x1 + 1.0;
            y2 = y1 + 1.0;
        }
        Rect::new(x1, y1, x2, y2)
    }
}

/// Sample one cubic segment into `out` with `points_per_segment` subdivisions.
///
/// With a non-zero mipmap level the four control values are pre-scaled by
/// `1 / 2^level` so the samples land directly in the downscaled image space.
pub(crate) fn eval_bezier_segment(
    first: &ControlPoint,
    last: &ControlPoint,
    time: FrameTime,
    mip_map_level: u32,
    points_per_segment: usize,
    out: &mut Vec<Point>,
    mut bbox: Option<&mut BoundsAccumulator>,
) {
    let [mut p0, mut p1, mut p2, mut p3] = segment_controls(first, last, time);

    if mip_map_level > 0 {
        let pot = f64::from(1u32 << mip_map_level);
        for p in [&mut p0, &mut p1, &mut p2, &mut p3] {
            p.x /= pot;
            p.y /= pot;
        }
    }

    let incr = 1.0 / (points_per_segment as f64 - 1.0);
    let mut t = 0.0;
    while t <= 1.0 {
        let cur = bezier_point(p0, p1, p2, p3, t);
        out.push(cur);
        if let Some(b) = bbox.as_deref_mut() {
            b.add(cur);
        }
        t += incr;
    }
}

/// Whether `(x, y)` lies within `acceptance_sq` (a squared distance) of the
/// segment, and if so the parameter of the closest of 100 samples.
pub(crate) fn is_point_on_segment(
    first: &ControlPoint,
    last: &ControlPoint,
    time: FrameTime,
    x: f64,
    y: f64,
    acceptance_sq: f64,
) -> Option<f64> {
    let [p0, p1, p2, p3] = segment_controls(first, last, time);

    let incr = 1.0 / (100.0 - 1.0);
    let mut min_distance = f64::from(i32::MAX);
    let mut t_for_min = -1.0;
    let mut t = 0.0;
    while t <= 1.0 {
        let p = bezier_point(p0, p1, p2, p3, t);
        let dist = (p.x - x) * (p.x - x) + (p.y - y) * (p.y - y);
        if dist < min_distance {
            min_distance = dist;
            t_for_min = t;
        }
        t += incr;
    }

    (min_distance <= acceptance_sq).then_some(t_for_min)
}

/// Whether the point's position at `time` falls in the acceptance box
/// around `(x, y)`.
pub(crate) fn is_point_close_to(
    time: FrameTime,
    p: &ControlPoint,
    x: f64,
    y: f64,
    acceptance: f64,
) -> bool {
    let (pos, _) = p.position_at(time);
    pos.x >= x - acceptance && pos.x <= x + acceptance && pos.y >= y - acceptance && pos.y <= y + acceptance
}

/// Whether the segments `(p0, p1)` and `(s0, s1)` trace different curves at
/// `time`, checking endpoints first and inner tangents second.
pub(crate) fn segments_differ(
    time: FrameTime,
    p0: &ControlPoint,
    p1: &ControlPoint,
    s0: &ControlPoint,
    s1: &ControlPoint,
) -> bool {
    if p0.position_at(time).0 != s0.position_at(time).0
        || p1.position_at(time).0 != s1.position_at(time).0
    {
        return true;
    }
    p0.right_at(time).0 != s0.right_at(time).0 || p1.left_at(time).0 != s1.left_at(time).0
}

fn segment_degree(p0: Point, p1: Point, p2: Point, p3: Point) -> (u32, bool) {
    let p0_eq_p1 = p0 == p1;
    let mut degree = 3;
    if p0_eq_p1 {
        degree -= 1;
    }
    if p1 == p2 {
        degree -= 1;
    }
    if p2 == p3 {
        degree -= 1;
    }
    (degree, p0_eq_p1)
}

/// Derivative of the incoming segment at `p` (parameter 1), with degenerate
/// control points reducing the segment to a quadratic or a line.
pub(crate) fn left_derivative_at(time: FrameTime, p: &ControlPoint, prev: &ControlPoint) -> Vec2 {
    let p0 = prev.position_at(time).0;
    let mut p1 = prev.right_at(time).0;
    let p2 = p.left_at(time).0;
    let p3 = p.position_at(time).0;

    let (degree, p0_eq_p1) = segment_degree(p0, p1, p2, p3);
    match degree {
        1 => Vec2::new(p3.x - p0.x, p3.y - p0.y),
        2 => {
            if p0_eq_p1 {
                p1 = p2;
            }
            Vec2::new(2.0 * (p3.x - p1.x), 2.0 * (p3.y - p1.y))
        }
        _ => Vec2::new(3.0 * (p3.x - p2.x), 3.0 * (p3.y - p2.y)),
    }
}

/// Derivative of the outgoing segment at `p` (parameter 0).
pub(crate) fn right_derivative_at(time: FrameTime, p: &ControlPoint, next: &ControlPoint) -> Vec2 {
    let p0 = p.position_at(time).0;
    let mut p1 = p.right_at(time).0;
    let p2 = next.left_at(time).0;
    let p3 = next.position_at(time).0;

    let (degree, p0_eq_p1) = segment_degree(p0, p1, p2, p3);
    match degree {
        1 => Vec2::new(p3.x - p0.x, p3.y - p0.y),
        2 => {
            if p0_eq_p1 {
                p1 = p2;
            }
            Vec2::new(2.0 * (p1.x - p0.x), 2.0 * (p1.y - p0.y))
        }
        _ => Vec2::new(3.0 * (p1.x - p0.x), 3.0 * (p1.y - p0.y)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shape/eval.rs"]
mod tests;
