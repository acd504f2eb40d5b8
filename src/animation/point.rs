use kurbo::Point;

use crate::animation::curve::ScalarCurve;
use crate::foundation::core::FrameTime;

/// A 2D value backed by two independent scalar curves with a static fallback.
///
/// Reading at a time with no keyframes returns the static fallback; reading
/// with keyframes interpolates and only falls back to the static value when
/// interpolation fails, so a usable position is always returned.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AnimatedPoint {
    curve_x: ScalarCurve,
    curve_y: ScalarCurve,
    static_x: f64,
    static_y: f64,
}

impl AnimatedPoint {
    /// Value at `time` plus whether `time` sits exactly on a keyframe.
    pub fn value_at(&self, time: FrameTime) -> (Point, bool) {
        if let Some(x) = self.curve_x.keyframe_at(time) {
            // both curves are always keyed at the same times
            let y = self.curve_y.keyframe_at(time).unwrap_or(self.static_y);
            return (Point::new(x, y), true);
        }
        match (self.curve_x.value_at(time), self.curve_y.value_at(time)) {
            (Ok(x), Ok(y)) => (Point::new(x, y), false),
            _ => (Point::new(self.static_x, self.static_y), false),
        }
    }

    /// Add or replace a keyframe at `time`.
    pub fn set_value_at(&mut self, time: FrameTime, x: f64, y: f64) {
        self.curve_x.add_keyframe(time, x);
        self.curve_y.add_keyframe(time, y);
    }

    /// Set the static fallback without creating a keyframe.
    pub fn set_static(&mut self, x: f64, y: f64) {
        self.static_x = x;
        self.static_y = y;
    }

    /// Snapshot the evaluated value at `time` into the static fallback.
    pub fn snapshot_to_static(&mut self, time: FrameTime) {
        let (p, _) = self.value_at(time);
        self.static_x = p.x;
        self.static_y = p.y;
    }

    /// Remove the keyframe at `time` from both curves.
    pub fn remove_keyframe(&mut self, time: FrameTime) {
        self.curve_x.remove_keyframe(time);
        self.curve_y.remove_keyframe(time);
    }

    /// Whether `time` is exactly on a keyframe.
    pub fn has_keyframe_at(&self, time: FrameTime) -> bool {
        self.curve_x.keyframe_at(time).is_some()
    }

    /// The `index`-th keyframe time in time order.
    pub fn keyframe_time(&self, index: usize) -> Option<FrameTime> {
        self.curve_x.keyframe_with_index(index).map(|(t, _)| t)
    }

    /// Keyframe times in ascending order.
    pub fn keyframe_times(&self) -> Vec<FrameTime> {
        self.curve_x.keyframe_times().collect()
    }

    /// Number of keyframes.
    pub fn keyframes_count(&self) -> usize {
        self.curve_x.keyframes_count()
    }

    /// The static fallback value.
    pub fn static_value(&self) -> Point {
        Point::new(self.static_x, self.static_y)
    }

    /// Make this point an exact copy of `other`, curves and fallback alike.
    pub fn clone_from_point(&mut self, other: &AnimatedPoint) {
        self.curve_x.clone_from_curve(&other.curve_x);
        self.curve_y.clone_from_curve(&other.curve_y);
        self.static_x = other.static_x;
        self.static_y = other.static_y;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/point.rs"]
mod tests;
