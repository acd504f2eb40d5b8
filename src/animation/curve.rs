use std::collections::BTreeMap;

use crate::foundation::core::FrameTime;
use crate::foundation::error::{RotoError, RotoResult};

/// An animated scalar: an ordered set of `(time, value)` keyframes.
///
/// Between keyframes the value is linearly interpolated; outside the keyed
/// range the boundary keyframe value holds. Sampling an empty curve is an
/// error ([`RotoError::NoKeyframes`]) so callers can fall back to a static
/// value.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ScalarCurve {
    keys: BTreeMap<FrameTime, f64>,
}

impl ScalarCurve {
    /// Empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the keyframe at `time`.
    pub fn add_keyframe(&mut self, time: FrameTime, value: f64) {
        self.keys.insert(time, value);
    }

    /// Remove the keyframe at `time`, if any.
    pub fn remove_keyframe(&mut self, time: FrameTime) {
        self.keys.remove(&time);
    }

    /// Exact keyframe value at `time`, `None` when `time` is not keyed.
    pub fn keyframe_at(&self, time: FrameTime) -> Option<f64> {
        self.keys.get(&time).copied()
    }

    /// The `index`-th keyframe in time order.
    pub fn keyframe_with_index(&self, index: usize) -> Option<(FrameTime, f64)> {
        self.keys.iter().nth(index).map(|(t, v)| (*t, *v))
    }

    /// Number of keyframes.
    pub fn keyframes_count(&self) -> usize {
        self.keys.len()
    }

    /// Keyframe times in ascending order.
    pub fn keyframe_times(&self) -> impl Iterator<Item = FrameTime> + '_ {
        self.keys.keys().copied()
    }

    /// Interpolated value at `time`.
    ///
    /// Holds the boundary value outside the keyed range. Fails only when the
    /// curve is empty.
    pub fn value_at(&self, time: FrameTime) -> RotoResult<f64> {
        if self.keys.is_empty() {
            return Err(RotoError::NoKeyframes);
        }
        if let Some(v) = self.keys.get(&time) {
            return Ok(*v);
        }
        let after = self.keys.range(time..).next();
        let before = self.keys.range(..time).next_back();
        match (before, after) {
            (Some((t0, v0)), Some((t1, v1))) => {
                let t = (time.0 - t0.0) as f64 / (t1.0 - t0.0) as f64;
                Ok(v0 + (v1 - v0) * t)
            }
            (Some((_, v)), None) | (None, Some((_, v))) => Ok(*v),
            (None, None) => Err(RotoError::NoKeyframes),
        }
    }

    /// Make this curve an exact copy of `other`.
    pub fn clone_from_curve(&mut self, other: &ScalarCurve) {
        self.keys = other.keys.clone();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/curve.rs"]
mod tests;
