use std::sync::{Arc, Mutex};

use kurbo::{Point, Rect};

use crate::context::{ContextLink, RotoEvent};
use crate::foundation::core::FrameTime;
use crate::foundation::error::{RotoError, RotoResult};
use crate::knob::param::Knob;
use crate::shape::eval::{self, BoundsAccumulator};
use crate::shape::point::ControlPoint;
use crate::tree::item::ItemCore;
use crate::tree::layer::RotoLayer;

/// Result of a hit-test against the evaluated outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveHit {
    /// Index of the segment's first control point.
    pub index: usize,
    /// Parameter along the segment where the closest sample was found.
    pub t: f64,
    /// Whether the feather outline was hit rather than the main one.
    pub feather: bool,
}

/// Which point list a rectangle selection should search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTarget {
    /// Control points and feather points.
    Both,
    /// Only the main control points.
    ControlPointsOnly,
    /// Only the feather points.
    FeatherPointsOnly,
}

struct BezierState {
    points: Vec<ControlPoint>,
    feather_points: Vec<ControlPoint>,
    finished: bool,
}

impl BezierState {
    /// The shape is keyed at `time` iff its first control point is; all
    /// points share the same keyframe times.
    fn has_keyframe_at(&self, time: FrameTime) -> bool {
        self.points.first().is_some_and(|p| p.has_keyframe_at(time))
    }

    fn keyframe_times(&self) -> Vec<FrameTime> {
        self.points
            .first()
            .map(ControlPoint::keyframe_times)
            .unwrap_or_default()
    }

    fn check_index(&self, index: usize) -> RotoResult<()> {
        if index >= self.points.len() {
            return Err(RotoError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        Ok(())
    }
}

/// A closed or open cubic bezier shape with a parallel feather outline.
///
/// Control points and feather points are kept in two lists of identical
/// length; the point at index `i` of one list always pairs with index `i`
/// of the other. All editing operations are restricted to the context's
/// edit thread, reads are safe from anywhere.
pub struct Bezier {
    core: ItemCore,
    state: Mutex<BezierState>,
    activated: Arc<Knob<bool>>,
    opacity: Arc<Knob<f64>>,
    feather: Arc<Knob<i32>>,
    feather_falloff: Arc<Knob<f64>>,
    inverted: Arc<Knob<bool>>,
    overlay_color: Mutex<[f64; 4]>,
}

impl Bezier {
    pub(crate) fn new(ctx: ContextLink, name: String, parent: Option<&Arc<RotoLayer>>) -> Self {
        Self {
            core: ItemCore::new(ctx, name, parent),
            state: Mutex::new(BezierState {
                points: Vec::new(),
                feather_points: Vec::new(),
                finished: false,
            }),
            activated: Arc::new(Knob::new(true)),
            opacity: Arc::new(Knob::new(1.0)),
            feather: Arc::new(Knob::new(0)),
            feather_falloff: Arc::new(Knob::new(1.0)),
            inverted: Arc::new(Knob::new(false)),
            overlay_color: Mutex::new([0.85, 0.67, 0.0, 1.0]),
        }
    }

    /// The shape's current name.
    pub fn name(&self) -> String {
        self.core.name()
    }

    /// Rename the shape. Edit thread only.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name.into());
    }

    /// Whether the item itself is activated, regardless of its knob.
    pub fn is_globally_activated(&self) -> bool {
        self.core.is_globally_activated()
    }

    /// Activate or deactivate the item outright.
    pub fn set_globally_activated(&self, activated: bool) {
        self.core.set_globally_activated(activated);
    }

    /// The owning layer.
    pub fn parent_layer(&self) -> Option<Arc<RotoLayer>> {
        self.core.parent_layer()
    }

    /// Append a control point (and its feather twin) at `(x, y)`.
    ///
    /// With auto-keying the point is keyed at the shape's first keyframe
    /// time, or at the playhead for the very first point; otherwise only
    /// the static values are set. Fails on a finished shape.
    pub fn add_control_point(&self, x: f64, y: f64) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let current_time = self.core.ctx.current_time()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            if state.finished {
                return Err(RotoError::validation(
                    "cannot add a control point to a finished shape",
                ));
            }

            // the first point keys at the playhead, later points re-use the
            // time the shape was first keyed at
            let keyframe_time = match state.points.first() {
                None => current_time,
                Some(first) => first.keyframe_time(0).unwrap_or(current_time),
            };

            let mut cp = ControlPoint::new(false);
            let mut fp = ControlPoint::new(true);
            for p in [&mut cp, &mut fp] {
                if auto_keying {
                    p.set_position_at(keyframe_time, x, y);
                    p.set_left_at(keyframe_time, x, y);
                    p.set_right_at(keyframe_time, x, y);
                } else {
                    p.set_static_position(x, y);
                    p.set_static_left(x, y);
                    p.set_static_right(x, y);
                }
            }
            state.points.push(cp);
            state.feather_points.push(fp);
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Subdivide the segment following `index` at parameter `t`, inserting
    /// a new control point that leaves the traced curve unchanged.
    ///
    /// The split is applied at every existing keyframe time (or to the
    /// static values when the shape has none): the surrounding tangents are
    /// shortened to the first-level lerps and the new point takes the
    /// second-level lerps as its tangents. Fails when `index` does not
    /// address a segment; nothing is mutated on failure.
    pub fn insert_control_point_after_index(&self, index: usize, t: f64) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let current_time = self.core.ctx.current_time()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let next = if index + 1 == state.points.len() {
                if !state.finished {
                    return Err(RotoError::IndexOutOfRange {
                        index,
                        len: state.points.len(),
                    });
                }
                0
            } else {
                index + 1
            };

            let mut cp = ControlPoint::new(false);
            let mut fp = ControlPoint::new(true);
            let keyframes = state.keyframe_times();

            for &time in &keyframes {
                let split = split_segment(&state.points[index], &state.points[next], time, t);
                state.points[index].set_right_at(time, split.prev_right.x, split.prev_right.y);
                state.feather_points[index].set_right_at(time, split.prev_right.x, split.prev_right.y);
                state.points[next].set_left_at(time, split.next_left.x, split.next_left.y);
                state.feather_points[next].set_left_at(time, split.next_left.x, split.next_left.y);
                for p in [&mut cp, &mut fp] {
                    p.set_position_at(time, split.position.x, split.position.y);
                    p.set_left_at(time, split.left.x, split.left.y);
                    p.set_right_at(time, split.right.x, split.right.y);
                }
            }

            if keyframes.is_empty() {
                let split = split_segment(&state.points[index], &state.points[next], FrameTime(0), t);
                state.points[index].set_static_right(split.prev_right.x, split.prev_right.y);
                state.feather_points[index].set_static_right(split.prev_right.x, split.prev_right.y);
                state.points[next].set_static_left(split.next_left.x, split.next_left.y);
                state.feather_points[next].set_static_left(split.next_left.x, split.next_left.y);
                for p in [&mut cp, &mut fp] {
                    p.set_static_position(split.position.x, split.position.y);
                    p.set_static_left(split.left.x, split.left.y);
                    p.set_static_right(split.right.x, split.right.y);
                }
            }

            state.points.insert(index + 1, cp);
            state.feather_points.insert(index + 1, fp);
        }
        if auto_keying && !self.has_keyframe_at(current_time) {
            self.set_keyframe(current_time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Remove the control point and its feather twin at `index`.
    pub fn remove_control_point_by_index(&self, index: usize) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            state.points.remove(index);
            state.feather_points.remove(index);
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Translate the control point at `index` by `(dx, dy)`.
    ///
    /// The feather twin follows when feather-link is on or when it still
    /// coincides with the control point. Writes are keyed only with
    /// auto-keying or an existing keyframe at `time`; ripple edit repeats
    /// the same absolute result at every keyframe time.
    pub fn move_point_by_index(
        &self,
        index: usize,
        time: FrameTime,
        dx: f64,
        dy: f64,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let feather_link = self.core.ctx.feather_link()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;

            let (pos, on_keyframe) = state.points[index].position_at(time);
            let (left, _) = state.points[index].left_at(time);
            let (right, _) = state.points[index].right_at(time);
            let (pos_f, _) = state.feather_points[index].position_at(time);
            let (left_f, _) = state.feather_points[index].left_at(time);
            let (right_f, _) = state.feather_points[index].right_at(time);

            let move_feather =
                feather_link || state.points[index].equals_at_time(time, &state.feather_points[index]);

            if auto_keying || on_keyframe {
                state.points[index].set_position_at(time, pos.x + dx, pos.y + dy);
                state.points[index].set_left_at(time, left.x + dx, left.y + dy);
                state.points[index].set_right_at(time, right.x + dx, right.y + dy);
                if move_feather {
                    state.feather_points[index].set_position_at(time, pos_f.x + dx, pos_f.y + dy);
                    state.feather_points[index].set_left_at(time, left_f.x + dx, left_f.y + dy);
                    state.feather_points[index].set_right_at(time, right_f.x + dx, right_f.y + dy);
                }
            }

            if ripple_edit {
                for t in state.keyframe_times() {
                    state.points[index].set_position_at(t, pos.x + dx, pos.y + dy);
                    state.points[index].set_left_at(t, left.x + dx, left.y + dy);
                    state.points[index].set_right_at(t, right.x + dx, right.y + dy);
                    if move_feather {
                        state.feather_points[index].set_position_at(t, pos_f.x + dx, pos_f.y + dy);
                        state.feather_points[index].set_left_at(t, left_f.x + dx, left_f.y + dy);
                        state.feather_points[index].set_right_at(t, right_f.x + dx, right_f.y + dy);
                    }
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Translate the feather point at `index` by `(dx, dy)` without
    /// touching its control point.
    pub fn move_feather_by_index(
        &self,
        index: usize,
        time: FrameTime,
        dx: f64,
        dy: f64,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;

            let (pos, on_keyframe) = state.feather_points[index].position_at(time);
            let (left, _) = state.feather_points[index].left_at(time);
            let (right, _) = state.feather_points[index].right_at(time);

            if auto_keying || on_keyframe {
                state.feather_points[index].set_position_at(time, pos.x + dx, pos.y + dy);
                state.feather_points[index].set_left_at(time, left.x + dx, left.y + dy);
                state.feather_points[index].set_right_at(time, right.x + dx, right.y + dy);
            }

            if ripple_edit {
                for t in state.keyframe_times() {
                    state.feather_points[index].set_position_at(t, pos.x + dx, pos.y + dy);
                    state.feather_points[index].set_left_at(t, left.x + dx, left.y + dy);
                    state.feather_points[index].set_right_at(t, right.x + dx, right.y + dy);
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Translate the left tangent end of the point at `index`.
    ///
    /// Without a keyframe and without auto-keying the static value moves
    /// instead, so a shape still under construction can be edited.
    pub fn move_left_bezier_point(
        &self,
        index: usize,
        time: FrameTime,
        dx: f64,
        dy: f64,
    ) -> RotoResult<()> {
        self.move_tangent(index, time, dx, dy, true)
    }

    /// Translate the right tangent end of the point at `index`.
    pub fn move_right_bezier_point(
        &self,
        index: usize,
        time: FrameTime,
        dx: f64,
        dy: f64,
    ) -> RotoResult<()> {
        self.move_tangent(index, time, dx, dy, false)
    }

    fn move_tangent(
        &self,
        index: usize,
        time: FrameTime,
        dx: f64,
        dy: f64,
        left_side: bool,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let feather_link = self.core.ctx.feather_link()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;

            let read = |p: &ControlPoint| if left_side { p.left_at(time) } else { p.right_at(time) };
            let (p, _) = read(&state.points[index]);
            // keyed-ness follows the feather twin here
            let (p_f, on_keyframe) = read(&state.feather_points[index]);

            let move_feather = feather_link || p == p_f;

            let write =
                |cp: &mut ControlPoint, t: FrameTime, x: f64, y: f64| if left_side {
                    cp.set_left_at(t, x, y)
                } else {
                    cp.set_right_at(t, x, y)
                };

            if auto_keying || on_keyframe {
                write(&mut state.points[index], time, p.x + dx, p.y + dy);
                if move_feather {
                    write(&mut state.feather_points[index], time, p_f.x + dx, p_f.y + dy);
                }
            } else {
                if left_side {
                    state.points[index].set_static_left(p.x + dx, p.y + dy);
                    if move_feather {
                        state.feather_points[index].set_static_left(p_f.x + dx, p_f.y + dy);
                    }
                } else {
                    state.points[index].set_static_right(p.x + dx, p.y + dy);
                    if move_feather {
                        state.feather_points[index].set_static_right(p_f.x + dx, p_f.y + dy);
                    }
                }
            }

            if ripple_edit {
                for t in state.keyframe_times() {
                    write(&mut state.points[index], t, p.x + dx, p.y + dy);
                    if move_feather {
                        write(&mut state.feather_points[index], t, p_f.x + dx, p_f.y + dy);
                    }
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Place the left tangent end of both the control point and its feather
    /// twin at the absolute position `(x, y)`.
    pub fn set_left_bezier_point(
        &self,
        index: usize,
        time: FrameTime,
        x: f64,
        y: f64,
    ) -> RotoResult<()> {
        self.set_tangent(index, time, x, y, true)
    }

    /// Place the right tangent end of both lists at `(x, y)`.
    pub fn set_right_bezier_point(
        &self,
        index: usize,
        time: FrameTime,
        x: f64,
        y: f64,
    ) -> RotoResult<()> {
        self.set_tangent(index, time, x, y, false)
    }

    fn set_tangent(
        &self,
        index: usize,
        time: FrameTime,
        x: f64,
        y: f64,
        left_side: bool,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let on_keyframe = state.has_keyframe_at(time);

            let write =
                |cp: &mut ControlPoint, t: FrameTime| if left_side {
                    cp.set_left_at(t, x, y)
                } else {
                    cp.set_right_at(t, x, y)
                };

            if auto_keying || on_keyframe {
                write(&mut state.points[index], time);
                write(&mut state.feather_points[index], time);
            } else if left_side {
                state.points[index].set_static_left(x, y);
                state.feather_points[index].set_static_left(x, y);
            } else {
                state.points[index].set_static_right(x, y);
                state.feather_points[index].set_static_right(x, y);
            }

            if ripple_edit {
                for t in state.keyframe_times() {
                    write(&mut state.points[index], t);
                    write(&mut state.feather_points[index], t);
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Overwrite position and both tangents of one point of either list.
    pub fn set_point_at_index(
        &self,
        feather: bool,
        index: usize,
        time: FrameTime,
        x: f64,
        y: f64,
        lx: f64,
        ly: f64,
        rx: f64,
        ry: f64,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let on_keyframe = state.has_keyframe_at(time);

            let list = if feather {
                &mut state.feather_points
            } else {
                &mut state.points
            };

            if auto_keying || on_keyframe {
                list[index].set_position_at(time, x, y);
                list[index].set_left_at(time, lx, ly);
                list[index].set_right_at(time, rx, ry);
            }

            if ripple_edit {
                let times = state.keyframe_times();
                let list = if feather {
                    &mut state.feather_points
                } else {
                    &mut state.points
                };
                for t in times {
                    list[index].set_position_at(t, x, y);
                    list[index].set_left_at(t, lx, ly);
                    list[index].set_right_at(t, rx, ry);
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Overwrite both tangent ends of one point of either list, leaving the
    /// position alone.
    pub fn set_point_left_and_right(
        &self,
        feather: bool,
        index: usize,
        time: FrameTime,
        lx: f64,
        ly: f64,
        rx: f64,
        ry: f64,
    ) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let on_keyframe = state.has_keyframe_at(time);
            let times = state.keyframe_times();

            let list = if feather {
                &mut state.feather_points
            } else {
                &mut state.points
            };

            if auto_keying || on_keyframe {
                list[index].set_left_at(time, lx, ly);
                list[index].set_right_at(time, rx, ry);
            }

            if ripple_edit {
                for t in times {
                    list[index].set_left_at(t, lx, ly);
                    list[index].set_right_at(t, rx, ry);
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Collapse the feather point at `index` back onto its control point by
    /// copying the control point's full animation over it.
    pub fn remove_feather_at_index(&self, index: usize) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let cp = state.points[index].clone();
            state.feather_points[index].clone_from(&cp);
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Smooth both the control point and its feather twin at `index`.
    pub fn smooth_point_at_index(&self, index: usize, time: FrameTime) -> RotoResult<()> {
        self.cusp_or_smooth(index, time, false)
    }

    /// Cusp both the control point and its feather twin at `index`.
    pub fn cusp_point_at_index(&self, index: usize, time: FrameTime) -> RotoResult<()> {
        self.cusp_or_smooth(index, time, true)
    }

    fn cusp_or_smooth(&self, index: usize, time: FrameTime, cusp: bool) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        let auto_keying = self.core.ctx.auto_keying()?;
        let ripple_edit = self.core.ctx.ripple_edit()?;
        {
            let mut state = self.state.lock().expect("bezier lock");
            state.check_index(index)?;
            let len = state.points.len();

            if cusp {
                state.points[index].cusp_point(time, auto_keying, ripple_edit);
                state.feather_points[index].cusp_point(time, auto_keying, ripple_edit);
            } else {
                // neighbors wrap around, a lone point has none
                let prev_idx = if index == 0 { len - 1 } else { index - 1 };
                let next_idx = if index + 1 == len { 0 } else { index + 1 };
                for feather in [false, true] {
                    let list = if feather {
                        &mut state.feather_points
                    } else {
                        &mut state.points
                    };
                    if len == 1 {
                        let mut p = list[index].clone();
                        p.smooth_point(time, None, None, auto_keying, ripple_edit);
                        list[index] = p;
                    } else {
                        let prev = list[prev_idx].clone();
                        let next = list[next_idx].clone();
                        list[index].smooth_point(time, Some(&prev), Some(&next), auto_keying, ripple_edit);
                    }
                }
            }
        }
        if auto_keying {
            self.set_keyframe(time)?;
        }
        self.core.ctx.bump_age();
        Ok(())
    }

    /// Key every point of both lists at `time` with their current values.
    ///
    /// Already-keyed times are re-asserted rather than skipped, and the
    /// keyframe notification fires exactly once per call either way.
    pub fn set_keyframe(&self, time: FrameTime) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        {
            let mut state = self.state.lock().expect("bezier lock");
            if !state.has_keyframe_at(time) {
                for feather in [false, true] {
                    let list = if feather {
                        &mut state.feather_points
                    } else {
                        &mut state.points
                    };
                    for p in list.iter_mut() {
                        let (pos, _) = p.position_at(time);
                        p.set_position_at(time, pos.x, pos.y);
                        let (left, _) = p.left_at(time);
                        let (right, _) = p.right_at(time);
                        p.set_left_at(time, left.x, left.y);
                        p.set_right_at(time, right.x, right.y);
                    }
                }
            }
        }
        self.core.ctx.bump_age();
        self.core.ctx.notify(RotoEvent::KeyframeSet {
            item: self.name(),
            time,
        });
        Ok(())
    }

    /// Remove the keyframe at `time` from every point of both lists.
    ///
    /// A time that is not keyed is ignored and emits no notification.
    pub fn remove_keyframe(&self, time: FrameTime) -> RotoResult<()> {
        self.core.ctx.assert_edit_thread();
        {
            let mut state = self.state.lock().expect("bezier lock");
            if !state.has_keyframe_at(time) {
                return Ok(());
            }
            for feather in [false, true] {
                let list = if feather {
                    &mut state.feather_points
                } else {
                    &mut state.points
                };
                for p in list.iter_mut() {
                    p.remove_keyframe(time);
                }
            }
        }
        self.core.ctx.bump_age();
        self.core.ctx.notify(RotoEvent::KeyframeRemoved {
            item: self.name(),
            time,
        });
        Ok(())
    }

    /// Number of keyframes of the shape.
    pub fn keyframes_count(&self) -> usize {
        let state = self.state.lock().expect("bezier lock");
        state
            .points
            .first()
            .map_or(0, ControlPoint::keyframes_count)
    }

    /// The shape's keyframe times, ascending.
    pub fn keyframe_times(&self) -> Vec<FrameTime> {
        self.state.lock().expect("bezier lock").keyframe_times()
    }

    /// Whether the shape is keyed at `time`.
    pub fn has_keyframe_at(&self, time: FrameTime) -> bool {
        self.state.lock().expect("bezier lock").has_keyframe_at(time)
    }

    /// The greatest keyframe time strictly before `time`.
    pub fn previous_keyframe_time(&self, time: FrameTime) -> Option<FrameTime> {
        self.keyframe_times()
            .into_iter()
            .filter(|t| *t < time)
            .next_back()
    }

    /// The smallest keyframe time strictly after `time`.
    pub fn next_keyframe_time(&self, time: FrameTime) -> Option<FrameTime> {
        self.keyframe_times().into_iter().find(|t| *t > time)
    }

    /// Number of control points (the feather list always matches).
    pub fn control_points_count(&self) -> usize {
        self.state.lock().expect("bezier lock").points.len()
    }

    /// Snapshot of the control point at `index`.
    pub fn control_point_at(&self, index: usize) -> Option<ControlPoint> {
        self.state
            .lock()
            .expect("bezier lock")
            .points
            .get(index)
            .cloned()
    }

    /// Snapshot of the feather point at `index`.
    pub fn feather_point_at(&self, index: usize) -> Option<ControlPoint> {
        self.state
            .lock()
            .expect("bezier lock")
            .feather_points
            .get(index)
            .cloned()
    }

    /// Close or reopen the shape.
    pub fn set_finished(&self, finished: bool) {
        self.core.ctx.assert_edit_thread();
        self.state.lock().expect("bezier lock").finished = finished;
        self.core.ctx.bump_age();
    }

    /// Whether the shape is closed.
    pub fn is_finished(&self) -> bool {
        self.state.lock().expect("bezier lock").finished
    }

    /// Hit-test `(x, y)` against the main and feather outlines at the
    /// playhead time.
    ///
    /// A one-point shape degenerates to a box test around that point; other
    /// shapes walk the segments in order, testing the main outline before
    /// the feather outline of each segment.
    pub fn is_point_on_curve(&self, x: f64, y: f64, acceptance: f64) -> RotoResult<Option<CurveHit>> {
        let time = self.core.ctx.current_time()?;
        let state = self.state.lock().expect("bezier lock");

        if state.points.len() == 1 {
            if eval::is_point_close_to(time, &state.points[0], x, y, acceptance) {
                return Ok(Some(CurveHit {
                    index: 0,
                    t: 0.0,
                    feather: false,
                }));
            }
            if eval::is_point_close_to(time, &state.feather_points[0], x, y, acceptance) {
                return Ok(Some(CurveHit {
                    index: 0,
                    t: 0.0,
                    feather: true,
                }));
            }
            return Ok(None);
        }

        // squared distances inside the segment test save the sqrt
        let a2 = acceptance * acceptance;
        for index in 0..state.points.len() {
            let next = if index + 1 == state.points.len() {
                if !state.finished {
                    return Ok(None);
                }
                0
            } else {
                index + 1
            };
            if let Some(t) =
                eval::is_point_on_segment(&state.points[index], &state.points[next], time, x, y, a2)
            {
                return Ok(Some(CurveHit {
                    index,
                    t,
                    feather: false,
                }));
            }
            if let Some(t) = eval::is_point_on_segment(
                &state.feather_points[index],
                &state.feather_points[next],
                time,
                x,
                y,
                a2,
            ) {
                return Ok(Some(CurveHit {
                    index,
                    t,
                    feather: true,
                }));
            }
        }
        Ok(None)
    }

    /// Index of the control or feather point whose position at the playhead
    /// falls in the acceptance box around `(x, y)`. Control points are
    /// searched first; the flag reports whether the feather list matched.
    pub fn is_nearby_control_point(
        &self,
        x: f64,
        y: f64,
        acceptance: f64,
    ) -> RotoResult<Option<(usize, bool)>> {
        let time = self.core.ctx.current_time()?;
        let state = self.state.lock().expect("bezier lock");

        for (i, p) in state.points.iter().enumerate() {
            if eval::is_point_close_to(time, p, x, y, acceptance) {
                return Ok(Some((i, false)));
            }
        }
        for (i, p) in state.feather_points.iter().enumerate() {
            if eval::is_point_close_to(time, p, x, y, acceptance) {
                return Ok(Some((i, true)));
            }
        }
        Ok(None)
    }

    /// Indices of the points falling inside the rectangle `[l, r] x [b, t]`
    /// grown by `acceptance`, at the playhead time.
    ///
    /// Each index appears at most once; the flag reports whether the match
    /// came from the feather list.
    pub fn control_points_within_rect(
        &self,
        l: f64,
        r: f64,
        b: f64,
        t: f64,
        acceptance: f64,
        target: SelectionTarget,
    ) -> RotoResult<Vec<(usize, bool)>> {
        let time = self.core.ctx.current_time()?;
        let state = self.state.lock().expect("bezier lock");
        let mut ret: Vec<(usize, bool)> = Vec::new();

        let inside = |p: &ControlPoint| {
            let (pos, _) = p.position_at(time);
            pos.x >= l - acceptance
                && pos.x <= r + acceptance
                && pos.y >= b - acceptance
                && pos.y <= t + acceptance
        };

        if matches!(target, SelectionTarget::Both | SelectionTarget::ControlPointsOnly) {
            for (i, p) in state.points.iter().enumerate() {
                if inside(p) {
                    ret.push((i, false));
                }
            }
        }
        if matches!(target, SelectionTarget::Both | SelectionTarget::FeatherPointsOnly) {
            for (i, p) in state.feather_points.iter().enumerate() {
                if inside(p) && !ret.iter().any(|(j, _)| *j == i) {
                    ret.push((i, true));
                }
            }
        }
        Ok(ret)
    }

    /// Sample the main outline at `time`.
    ///
    /// Each segment contributes `points_per_segment` samples; a non-zero
    /// mipmap level pre-scales the control values so the samples land in
    /// the downscaled image space. An open shape stops at its last point.
    pub fn evaluate_at_time(
        &self,
        time: FrameTime,
        mip_map_level: u32,
        points_per_segment: usize,
    ) -> Vec<Point> {
        let mut out = Vec::new();
        self.evaluate_with_bounds(time, mip_map_level, points_per_segment, &mut out, None);
        out
    }

    /// Sample the feather outline at `time`, skipping every segment that
    /// traces the same curve as its main-outline counterpart.
    pub fn evaluate_feather_points_at_time(
        &self,
        time: FrameTime,
        points_per_segment: usize,
    ) -> Vec<Point> {
        let mut out = Vec::new();
        self.evaluate_feather_with_bounds(time, points_per_segment, &mut out, None);
        out
    }

    fn evaluate_with_bounds(
        &self,
        time: FrameTime,
        mip_map_level: u32,
        points_per_segment: usize,
        out: &mut Vec<Point>,
        mut bbox: Option<&mut BoundsAccumulator>,
    ) {
        let state = self.state.lock().expect("bezier lock");
        for index in 0..state.points.len() {
            let next = if index + 1 == state.points.len() {
                if !state.finished {
                    break;
                }
                0
            } else {
                index + 1
            };
            eval::eval_bezier_segment(
                &state.points[index],
                &state.points[next],
                time,
                mip_map_level,
                points_per_segment,
                out,
                bbox.as_deref_mut(),
            );
        }
    }

    fn evaluate_feather_with_bounds(
        &self,
        time: FrameTime,
        points_per_segment: usize,
        out: &mut Vec<Point>,
        mut bbox: Option<&mut BoundsAccumulator>,
    ) {
        let state = self.state.lock().expect("bezier lock");
        for index in 0..state.feather_points.len() {
            let next = if index + 1 == state.feather_points.len() {
                if !state.finished {
                    break;
                }
                0
            } else {
                index + 1
            };
            if eval::segments_differ(
                time,
                &state.points[index],
                &state.points[next],
                &state.feather_points[index],
                &state.feather_points[next],
            ) {
                eval::eval_bezier_segment(
                    &state.feather_points[index],
                    &state.feather_points[next],
                    time,
                    0,
                    points_per_segment,
                    out,
                    bbox.as_deref_mut(),
                );
            }
        }
    }

    /// Bounding box of both outlines at `time`, from 50 samples per
    /// segment. Degenerates to a unit box at the origin for an empty shape.
    pub fn bounding_box(&self, time: FrameTime) -> Rect {
        let mut bounds = BoundsAccumulator::new();
        let mut pts = Vec::new();
        self.evaluate_with_bounds(time, 0, 50, &mut pts, Some(&mut bounds));
        self.evaluate_feather_with_bounds(time, 50, &mut pts, Some(&mut bounds));
        bounds.finish()
    }

    /// Whether the shape renders at `time`: the item must be globally
    /// activated and its activated knob true.
    pub fn is_activated(&self, time: FrameTime) -> bool {
        if !self.core.is_globally_activated() {
            return false;
        }
        self.activated.value_at(time)
    }

    /// Opacity in `[0, 1]` at `time`.
    pub fn opacity(&self, time: FrameTime) -> f64 {
        self.opacity.value_at(time)
    }

    /// Feather distance in pixels at `time`.
    pub fn feather_distance(&self, time: FrameTime) -> i32 {
        self.feather.value_at(time)
    }

    /// Feather falloff exponent at `time`.
    pub fn feather_falloff(&self, time: FrameTime) -> f64 {
        self.feather_falloff.value_at(time)
    }

    /// Whether the rendered mask is inverted at `time`.
    pub fn inverted(&self, time: FrameTime) -> bool {
        self.inverted.value_at(time)
    }

    /// The overlay color drawn by interfaces, RGBA.
    pub fn overlay_color(&self) -> [f64; 4] {
        *self.overlay_color.lock().expect("bezier lock")
    }

    /// Set the overlay color. Edit thread only.
    pub fn set_overlay_color(&self, color: [f64; 4]) {
        self.core.ctx.assert_edit_thread();
        *self.overlay_color.lock().expect("bezier lock") = color;
    }

    /// The activated knob.
    pub fn activated_knob(&self) -> &Arc<Knob<bool>> {
        &self.activated
    }

    /// The opacity knob.
    pub fn opacity_knob(&self) -> &Arc<Knob<f64>> {
        &self.opacity
    }

    /// The feather distance knob.
    pub fn feather_knob(&self) -> &Arc<Knob<i32>> {
        &self.feather
    }

    /// The feather falloff knob.
    pub fn feather_falloff_knob(&self) -> &Arc<Knob<f64>> {
        &self.feather_falloff
    }

    /// The inverted knob.
    pub fn inverted_knob(&self) -> &Arc<Knob<bool>> {
        &self.inverted
    }

    pub(crate) fn item_core(&self) -> &ItemCore {
        &self.core
    }

    pub(crate) fn shape_snapshot(&self) -> (Vec<ControlPoint>, Vec<ControlPoint>, bool) {
        let state = self.state.lock().expect("bezier lock");
        (
            state.points.clone(),
            state.feather_points.clone(),
            state.finished,
        )
    }

    pub(crate) fn load_shape(
        &self,
        points: Vec<ControlPoint>,
        feather_points: Vec<ControlPoint>,
        finished: bool,
    ) {
        let mut state = self.state.lock().expect("bezier lock");
        state.points = points;
        state.feather_points = feather_points;
        state.finished = finished;
    }
}

struct SegmentSplit {
    prev_right: Point,
    next_left: Point,
    left: Point,
    position: Point,
    right: Point,
}

/// De Casteljau split of the segment `(prev, next)` at parameter `t`.
fn split_segment(prev: &ControlPoint, next: &ControlPoint, time: FrameTime, t: f64) -> SegmentSplit {
    let p0 = prev.position_at(time).0;
    let p1 = prev.right_at(time).0;
    let p2 = next.left_at(time).0;
    let p3 = next.position_at(time).0;

    let lerp = |a: Point, b: Point| Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
    let p0p1 = lerp(p0, p1);
    let p1p2 = lerp(p1, p2);
    let p2p3 = lerp(p2, p3);
    let p0p1_p1p2 = lerp(p0p1, p1p2);
    let p1p2_p2p3 = lerp(p1p2, p2p3);
    let dst = lerp(p0p1_p1p2, p1p2_p2p3);

    SegmentSplit {
        prev_right: p0p1,
        next_left: p2p3,
        left: p0p1_p1p2,
        position: dst,
        right: p1p2_p2p3,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shape/bezier.rs"]
mod tests;
