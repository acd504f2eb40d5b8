use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::foundation::core::FrameTime;

/// Interpolation contract for knob value types.
pub trait KnobValue: Clone {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn interpolate(a: &Self, b: &Self, t: f64) -> Self;
}

impl KnobValue for f64 {
    fn interpolate(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

// discrete values hold until the next keyframe
impl KnobValue for bool {
    fn interpolate(a: &Self, _b: &Self, _t: f64) -> Self {
        *a
    }
}

impl KnobValue for i32 {
    fn interpolate(a: &Self, _b: &Self, _t: f64) -> Self {
        *a
    }
}

/// An animatable named parameter: a typed value plus optional keyframes.
///
/// A knob may be slaved to a master knob of the same type, in which case all
/// value queries are answered by the master until [`Knob::unslave`] restores
/// the knob's own state. Reads are safe from any thread.
#[derive(Debug)]
pub struct Knob<T> {
    inner: Mutex<KnobInner<T>>,
}

#[derive(Debug)]
struct KnobInner<T> {
    value: T,
    keys: BTreeMap<FrameTime, T>,
    enabled: bool,
    dirty: bool,
    master: Option<Arc<Knob<T>>>,
}

impl<T: KnobValue> Knob<T> {
    /// Build a knob holding `value` with no keyframes.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(KnobInner {
                value,
                keys: BTreeMap::new(),
                enabled: true,
                dirty: false,
                master: None,
            }),
        }
    }

    /// Value at `time`: the master's value while slaved, otherwise the
    /// keyframe interpolation, otherwise the plain value.
    pub fn value_at(&self, time: FrameTime) -> T {
        let master = {
            let inner = self.inner.lock().expect("knob lock");
            match &inner.master {
                Some(m) => m.clone(),
                None => return inner.sample(time),
            }
        };
        master.value_at(time)
    }

    /// Set the non-animated value.
    pub fn set_value(&self, value: T) {
        self.inner.lock().expect("knob lock").value = value;
    }

    /// Add or replace a keyframe at `time`.
    pub fn set_value_at_time(&self, time: FrameTime, value: T) {
        self.inner.lock().expect("knob lock").keys.insert(time, value);
    }

    /// Route all value queries of this knob to `master`.
    pub fn slave_to(&self, master: &Arc<Knob<T>>) {
        self.inner.lock().expect("knob lock").master = Some(master.clone());
    }

    /// Detach from the master, restoring this knob's own state.
    pub fn unslave(&self) {
        self.inner.lock().expect("knob lock").master = None;
    }

    /// Whether the knob is currently slaved.
    pub fn is_slaved(&self) -> bool {
        self.inner.lock().expect("knob lock").master.is_some()
    }

    /// Enable or disable the knob for editing.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.lock().expect("knob lock").enabled = enabled;
    }

    /// Whether the knob is enabled for editing.
    pub fn is_enabled(&self) -> bool {
        self.inner.lock().expect("knob lock").enabled
    }

    /// Mark the displayed value as not representative of every linked item.
    pub fn set_dirty(&self, dirty: bool) {
        self.inner.lock().expect("knob lock").dirty = dirty;
    }

    /// Whether the knob is marked dirty.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().expect("knob lock").dirty
    }

    /// Copy value and keyframes from `other`; the link state is untouched.
    pub fn clone_from_knob(&self, other: &Knob<T>) {
        let (value, keys) = {
            let o = other.inner.lock().expect("knob lock");
            (o.value.clone(), o.keys.clone())
        };
        let mut inner = self.inner.lock().expect("knob lock");
        inner.value = value;
        inner.keys = keys;
    }

    /// Own (unslaved) value and keyframes, for serialization.
    pub fn own_state(&self) -> (T, Vec<(FrameTime, T)>) {
        let inner = self.inner.lock().expect("knob lock");
        let keys = inner.keys.iter().map(|(t, v)| (*t, v.clone())).collect();
        (inner.value.clone(), keys)
    }

    /// Replace own value and keyframes, for deserialization.
    pub fn load_state(&self, value: T, keys: Vec<(FrameTime, T)>) {
        let mut inner = self.inner.lock().expect("knob lock");
        inner.value = value;
        inner.keys = keys.into_iter().collect();
    }
}

impl<T: KnobValue> KnobInner<T> {
    fn sample(&self, time: FrameTime) -> T {
        if self.keys.is_empty() {
            return self.value.clone();
        }
        if let Some(v) = self.keys.get(&time) {
            return v.clone();
        }
        let after = self.keys.range(time..).next();
        let before = self.keys.range(..time).next_back();
        match (before, after) {
            (Some((t0, v0)), Some((t1, v1))) => {
                let t = (time.0 - t0.0) as f64 / (t1.0 - t0.0) as f64;
                T::interpolate(v0, v1, t)
            }
            (Some((_, v)), None) | (None, Some((_, v))) => v.clone(),
            (None, None) => self.value.clone(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/knob/param.rs"]
mod tests;
