use std::f64::consts::PI;

use kurbo::Point;

use crate::animation::point::AnimatedPoint;
use crate::foundation::core::FrameTime;
use crate::shape::eval;

/// Distance used both as the cusp snap threshold and as the length of the
/// tangents produced by smoothing a cusped point.
const TANGENTS_CUSP_LIMIT: f64 = 50.0;

/// Which tangent of a control point a hit-test matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TangentSide {
    /// The tangent toward the previous point.
    Left,
    /// The tangent toward the next point.
    Right,
}

/// One control point of a bezier shape: an animated position plus two
/// animated tangent ends, all keyed at the same times.
///
/// The same type describes both outline control points and feather points;
/// the flag only matters for hit-testing and smoothing neighbor lookup.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ControlPoint {
    position: AnimatedPoint,
    left: AnimatedPoint,
    right: AnimatedPoint,
    feather: bool,
}

impl ControlPoint {
    /// A point at the origin with coincident tangents.
    pub fn new(feather: bool) -> Self {
        Self {
            feather,
            ..Self::default()
        }
    }

    /// Whether this is a feather point.
    pub fn is_feather_point(&self) -> bool {
        self.feather
    }

    /// Position at `time`, plus whether `time` is exactly keyed.
    pub fn position_at(&self, time: FrameTime) -> (Point, bool) {
        self.position.value_at(time)
    }

    /// Left tangent end at `time`, plus whether `time` is exactly keyed.
    pub fn left_at(&self, time: FrameTime) -> (Point, bool) {
        self.left.value_at(time)
    }

    /// Right tangent end at `time`, plus whether `time` is exactly keyed.
    pub fn right_at(&self, time: FrameTime) -> (Point, bool) {
        self.right.value_at(time)
    }

    /// Key the position at `time`.
    pub fn set_position_at(&mut self, time: FrameTime, x: f64, y: f64) {
        self.position.set_value_at(time, x, y);
    }

    /// Key the left tangent end at `time`.
    pub fn set_left_at(&mut self, time: FrameTime, x: f64, y: f64) {
        self.left.set_value_at(time, x, y);
    }

    /// Key the right tangent end at `time`.
    pub fn set_right_at(&mut self, time: FrameTime, x: f64, y: f64) {
        self.right.set_value_at(time, x, y);
    }

    /// Set the static position without creating a keyframe.
    pub fn set_static_position(&mut self, x: f64, y: f64) {
        self.position.set_static(x, y);
    }

    /// Set the static left tangent end without creating a keyframe.
    pub fn set_static_left(&mut self, x: f64, y: f64) {
        self.left.set_static(x, y);
    }

    /// Set the static right tangent end without creating a keyframe.
    pub fn set_static_right(&mut self, x: f64, y: f64) {
        self.right.set_static(x, y);
    }

    /// The static fallback position.
    pub fn static_position(&self) -> Point {
        self.position.static_value()
    }

    /// The static fallback left tangent end.
    pub fn static_left(&self) -> Point {
        self.left.static_value()
    }

    /// The static fallback right tangent end.
    pub fn static_right(&self) -> Point {
        self.right.static_value()
    }

    /// Remove the keyframe at `time` from position and both tangents.
    ///
    /// When this is the last keyframe, the values it holds are snapshotted
    /// into the static fallbacks first so the point does not jump back to
    /// stale coordinates.
    pub fn remove_keyframe(&mut self, time: FrameTime) {
        if self.position.keyframes_count() == 1 {
            self.position.snapshot_to_static(time);
            self.left.snapshot_to_static(time);
            self.right.snapshot_to_static(time);
        }
        self.position.remove_keyframe(time);
        self.left.remove_keyframe(time);
        self.right.remove_keyframe(time);
    }

    /// Whether the position is keyed exactly at `time`.
    pub fn has_keyframe_at(&self, time: FrameTime) -> bool {
        self.position.has_keyframe_at(time)
    }

    /// The `index`-th keyframe time in time order.
    pub fn keyframe_time(&self, index: usize) -> Option<FrameTime> {
        self.position.keyframe_time(index)
    }

    /// Keyframe times of the position, ascending.
    pub fn keyframe_times(&self) -> Vec<FrameTime> {
        self.position.keyframe_times()
    }

    /// Number of position keyframes.
    pub fn keyframes_count(&self) -> usize {
        self.position.keyframes_count()
    }

    /// Make this point an exact copy of `other`, keeping the feather flag.
    pub fn clone_from(&mut self, other: &ControlPoint) {
        self.position.clone_from_point(&other.position);
        self.left.clone_from_point(&other.left);
        self.right.clone_from_point(&other.right);
    }

    /// Whether position and both tangents evaluate equal at `time`.
    pub fn equals_at_time(&self, time: FrameTime, other: &ControlPoint) -> bool {
        self.position_at(time).0 == other.position_at(time).0
            && self.left_at(time).0 == other.left_at(time).0
            && self.right_at(time).0 == other.right_at(time).0
    }

    /// Which tangent end of this point lies within the acceptance box
    /// around `(x, y)` at `time`, if any. The left tangent wins ties.
    pub fn is_nearby_tangent(
        &self,
        time: FrameTime,
        x: f64,
        y: f64,
        acceptance: f64,
    ) -> Option<TangentSide> {
        let (left, _) = self.left_at(time);
        let (right, _) = self.right_at(time);
        if left.x >= x - acceptance
            && left.x <= x + acceptance
            && left.y >= y - acceptance
            && left.y <= y + acceptance
        {
            return Some(TangentSide::Left);
        }
        if right.x >= x - acceptance
            && right.x <= x + acceptance
            && right.y >= y - acceptance
            && right.y <= y + acceptance
        {
            return Some(TangentSide::Right);
        }
        None
    }

    /// Pull both tangents toward the position, producing a sharp corner.
    ///
    /// Tangents closer than [`TANGENTS_CUSP_LIMIT`] snap onto the position;
    /// farther tangents lose a quarter of their offset per call, so repeated
    /// cusping converges onto the point. Writes are keyed when auto-keying
    /// is on or `time` already holds a keyframe; with ripple edit the new
    /// tangents are also written at every existing keyframe time.
    pub fn cusp_point(&mut self, time: FrameTime, auto_keying: bool, ripple_edit: bool) {
        let (pos, _) = self.position_at(time);
        let (left, _) = self.left_at(time);
        let (right, on_keyframe) = self.right_at(time);

        let new_left = cusp_tangent(pos, left);
        let new_right = cusp_tangent(pos, right);

        if auto_keying || on_keyframe {
            self.set_left_at(time, new_left.x, new_left.y);
            self.set_right_at(time, new_right.x, new_right.y);
        }
        if ripple_edit {
            for t in self.keyframe_times() {
                self.set_left_at(t, new_left.x, new_left.y);
                self.set_right_at(t, new_right.x, new_right.y);
            }
        }
    }

    /// Rebuild both tangents so the curve passes smoothly through the point.
    ///
    /// A tangent coinciding with the position is replaced by a tangent along
    /// the bisector of the two one-sided curve derivatives, at a fixed
    /// length; a tangent already away from the position just grows by a
    /// quarter. `prev` and `next` are the list neighbors (wrapping), `None`
    /// when the point is alone on its curve. Keying follows the same rules
    /// as [`ControlPoint::cusp_point`].
    pub fn smooth_point(
        &mut self,
        time: FrameTime,
        prev: Option<&ControlPoint>,
        next: Option<&ControlPoint>,
        auto_keying: bool,
        ripple_edit: bool,
    ) {
        let (pos, _) = self.position_at(time);
        let (left, _) = self.left_at(time);
        let (right, on_keyframe) = self.right_at(time);

        let new_left = self.smooth_tangent(time, true, pos, left, prev, next);
        let new_right = self.smooth_tangent(time, false, pos, right, prev, next);

        if auto_keying || on_keyframe {
            self.set_left_at(time, new_left.x, new_left.y);
            self.set_right_at(time, new_right.x, new_right.y);
        }
        if ripple_edit {
            for t in self.keyframe_times() {
                self.set_left_at(t, new_left.x, new_left.y);
                self.set_right_at(t, new_right.x, new_right.y);
            }
        }
    }

    fn smooth_tangent(
        &self,
        time: FrameTime,
        left_side: bool,
        pos: Point,
        tangent: Point,
        prev: Option<&ControlPoint>,
        next: Option<&ControlPoint>,
    ) -> Point {
        if pos == tangent {
            let (Some(prev), Some(next)) = (prev, next) else {
                // a lone point has no curve direction to smooth along
                return tangent;
            };

            let left_d = eval::left_derivative_at(time, self, prev);
            let right_d = eval::right_derivative_at(time, self, next);

            let left_alpha = if left_d.x == 0.0 {
                if left_d.y < 0.0 { -PI / 2.0 } else { PI / 2.0 }
            } else {
                left_d.y.atan2(left_d.x)
            };
            let right_alpha = if right_d.x == 0.0 {
                if right_d.y < 0.0 { -PI / 2.0 } else { PI / 2.0 }
            } else {
                right_d.y.atan2(right_d.x)
            };
            let mut alpha = (left_alpha + right_alpha) / 2.0;
            if alpha.abs() > PI / 2.0 {
                alpha = if alpha < 0.0 { PI + alpha } else { alpha - PI };
            }

            let angle = if left_side { alpha } else { alpha + PI };
            Point::new(
                pos.x + angle.cos() * TANGENTS_CUSP_LIMIT,
                pos.y + angle.sin() * TANGENTS_CUSP_LIMIT,
            )
        } else {
            let mut dx = tangent.x - pos.x;
            let mut dy = tangent.y - pos.y;
            if dx == 0.0 && dy == 0.0 {
                dx = if dx < 0.0 {
                    -TANGENTS_CUSP_LIMIT
                } else {
                    TANGENTS_CUSP_LIMIT
                };
                dy = if dy < 0.0 {
                    -TANGENTS_CUSP_LIMIT
                } else {
                    TANGENTS_CUSP_LIMIT
                };
            }
            Point::new(pos.x + 1.25 * dx, pos.y + 1.25 * dy)
        }
    }
}

/// A quarter closer to the point per call, snapping once within the limit.
fn cusp_tangent(pos: Point, tangent: Point) -> Point {
    let dx = tangent.x - pos.x;
    let dy = tangent.y - pos.y;
    let dist_square = dx * dx + dy * dy;
    if dist_square <= TANGENTS_CUSP_LIMIT * TANGENTS_CUSP_LIMIT {
        pos
    } else {
        Point::new(pos.x + 0.75 * dx, pos.y + 0.75 * dy)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shape/point.rs"]
mod tests;
