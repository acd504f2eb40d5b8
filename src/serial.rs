//! Plain serde records mirroring the live tree, plus the save/load entry
//! points on [`RotoContext`].
//!
//! Records are decoupled from the live types on purpose: the tree is full
//! of shared handles and back-references that have no business in a
//! project file. Saving walks the tree into records, loading rebuilds the
//! tree from them and re-links the saved selection by name.

use std::sync::Arc;

use crate::context::{RotoContext, RotoEvent};
use crate::foundation::core::FrameTime;
use crate::foundation::error::{RotoError, RotoResult};
use crate::knob::param::{Knob, KnobValue};
use crate::shape::bezier::Bezier;
use crate::shape::point::ControlPoint;
use crate::tree::item::RotoItem;
use crate::tree::layer::RotoLayer;

/// Own (unslaved) state of one knob.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct KnobRecord<T> {
    /// The non-animated value.
    pub value: T,
    /// Keyframes, ascending by time.
    pub keys: Vec<(FrameTime, T)>,
}

impl<T: KnobValue> KnobRecord<T> {
    fn from_knob(knob: &Knob<T>) -> Self {
        let (value, keys) = knob.own_state();
        Self { value, keys }
    }

    fn load_into(&self, knob: &Knob<T>) {
        knob.load_state(self.value.clone(), self.keys.clone());
    }
}

/// One keyframe of a control point: position and both tangent ends.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PointKeyRecord {
    /// Keyed time.
    pub time: FrameTime,
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Left tangent end.
    pub left_x: f64,
    /// Left tangent end.
    pub left_y: f64,
    /// Right tangent end.
    pub right_x: f64,
    /// Right tangent end.
    pub right_y: f64,
}

/// Full animation of one control point.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PointRecord {
    /// Static fallbacks as `[x, y, left_x, left_y, right_x, right_y]`.
    pub statics: [f64; 6],
    /// One record per keyframe, ascending by time.
    pub keys: Vec<PointKeyRecord>,
}

impl PointRecord {
    fn from_point(p: &ControlPoint) -> Self {
        let sp = p.static_position();
        let sl = p.static_left();
        let sr = p.static_right();
        let keys = p
            .keyframe_times()
            .into_iter()
            .map(|time| {
                let (pos, _) = p.position_at(time);
                let (left, _) = p.left_at(time);
                let (right, _) = p.right_at(time);
                PointKeyRecord {
                    time,
                    x: pos.x,
                    y: pos.y,
                    left_x: left.x,
                    left_y: left.y,
                    right_x: right.x,
                    right_y: right.y,
                }
            })
            .collect();
        Self {
            statics: [sp.x, sp.y, sl.x, sl.y, sr.x, sr.y],
            keys,
        }
    }

    fn to_point(&self, feather: bool) -> ControlPoint {
        let mut p = ControlPoint::new(feather);
        let [x, y, lx, ly, rx, ry] = self.statics;
        p.set_static_position(x, y);
        p.set_static_left(lx, ly);
        p.set_static_right(rx, ry);
        for k in &self.keys {
            p.set_position_at(k.time, k.x, k.y);
            p.set_left_at(k.time, k.left_x, k.left_y);
            p.set_right_at(k.time, k.right_x, k.right_y);
        }
        p
    }
}

/// Persisted state of one bezier shape.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BezierRecord {
    /// Item name, unique within the context.
    pub name: String,
    /// Globally-activated flag of the item.
    pub activated: bool,
    /// Name of the owning layer, informational.
    pub parent_layer: Option<String>,
    /// Whether the shape is closed.
    pub closed: bool,
    /// Main outline points.
    pub control_points: Vec<PointRecord>,
    /// Feather points, one per control point.
    pub feather_points: Vec<PointRecord>,
    /// Activated knob.
    pub activated_knob: KnobRecord<bool>,
    /// Opacity knob.
    pub opacity: KnobRecord<f64>,
    /// Feather distance knob.
    pub feather: KnobRecord<i32>,
    /// Feather falloff knob.
    pub feather_falloff: KnobRecord<f64>,
    /// Inverted knob.
    pub inverted: KnobRecord<bool>,
    /// Overlay color, RGBA.
    pub overlay_color: [f64; 4],
}

/// Persisted state of one layer and, recursively, its subtree.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerRecord {
    /// Item name, unique within the context.
    pub name: String,
    /// Globally-activated flag of the item.
    pub activated: bool,
    /// Name of the owning layer, informational; `None` for the base layer.
    pub parent_layer: Option<String>,
    /// Children in render order.
    pub children: Vec<ItemRecord>,
}

/// A child of a layer record.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ItemRecord {
    /// A nested layer.
    Layer(LayerRecord),
    /// A bezier shape.
    Bezier(BezierRecord),
}

/// Persisted state of a whole context.
///
/// The age counter is deliberately not saved: cached masks do not survive
/// a reload, so a fresh context restarts at zero.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ContextRecord {
    /// Auto-keying policy flag.
    pub auto_keying: bool,
    /// Feather-link policy flag.
    pub feather_link: bool,
    /// Ripple-edit policy flag.
    pub ripple_edit: bool,
    /// The base layer and everything under it.
    pub base_layer: LayerRecord,
    /// Names of the selected items, re-linked on load.
    pub selected_items: Vec<String>,
}

fn bezier_record(bezier: &Arc<Bezier>) -> BezierRecord {
    let (points, feather_points, closed) = bezier.shape_snapshot();
    BezierRecord {
        name: bezier.name(),
        activated: bezier.is_globally_activated(),
        parent_layer: bezier.parent_layer().map(|l| l.name()),
        closed,
        control_points: points.iter().map(PointRecord::from_point).collect(),
        feather_points: feather_points.iter().map(PointRecord::from_point).collect(),
        activated_knob: KnobRecord::from_knob(bezier.activated_knob()),
        opacity: KnobRecord::from_knob(bezier.opacity_knob()),
        feather: KnobRecord::from_knob(bezier.feather_knob()),
        feather_falloff: KnobRecord::from_knob(bezier.feather_falloff_knob()),
        inverted: KnobRecord::from_knob(bezier.inverted_knob()),
        overlay_color: bezier.overlay_color(),
    }
}

fn layer_record(layer: &Arc<RotoLayer>) -> LayerRecord {
    LayerRecord {
        name: layer.name(),
        activated: layer.is_globally_activated(),
        parent_layer: layer.parent_layer().map(|l| l.name()),
        children: layer
            .items()
            .iter()
            .map(|item| match item {
                RotoItem::Layer(l) => ItemRecord::Layer(layer_record(l)),
                RotoItem::Bezier(b) => ItemRecord::Bezier(bezier_record(b)),
            })
            .collect(),
    }
}

impl RotoContext {
    /// Snapshot the whole context into a persistable record.
    pub fn save(&self) -> ContextRecord {
        ContextRecord {
            auto_keying: self.is_auto_keying_enabled(),
            feather_link: self.is_feather_link_enabled(),
            ripple_edit: self.is_ripple_edit_enabled(),
            base_layer: layer_record(&self.base_layer()),
            selected_items: self
                .selected_items()
                .iter()
                .map(RotoItem::name)
                .collect(),
        }
    }

    /// Rebuild the tree from `record` and re-link the saved selection.
    ///
    /// Only a freshly created context (holding just its base layer) can be
    /// loaded into. A shape record whose feather list does not pair up
    /// with its control points keeps the shape but drops both lists.
    pub fn load(&self, record: &ContextRecord) -> RotoResult<()> {
        self.core.assert_edit_thread();

        {
            let state = self.core.state.lock().expect("context lock");
            if state.layers.len() != 1 {
                return Err(RotoError::validation(
                    "a context can only be loaded while it holds nothing but its base layer",
                ));
            }
        }

        self.set_auto_keying_enabled(record.auto_keying);
        self.set_feather_link_enabled(record.feather_link);
        self.set_ripple_edit_enabled(record.ripple_edit);

        let base = self.base_layer();
        self.load_layer(&base, &record.base_layer)?;

        for name in &record.selected_items {
            match self.get_item_by_name(name) {
                Some(RotoItem::Bezier(b)) => self.link_bezier_to_context_knobs(&b),
                Some(RotoItem::Layer(l)) => {
                    link_beziers_recursively(self, &l);
                    let mut state = self.core.state.lock().expect("context lock");
                    state.selected.push(RotoItem::Layer(l));
                }
                None => {
                    tracing::warn!(item = %name, "selected item not found after load, skipping");
                }
            }
        }
        self.core.notify(&RotoEvent::SelectionChanged);
        Ok(())
    }

    fn load_layer(&self, layer: &Arc<RotoLayer>, record: &LayerRecord) -> RotoResult<()> {
        layer.set_name(record.name.clone());
        layer.set_globally_activated(record.activated);

        for child in &record.children {
            match child {
                ItemRecord::Bezier(rec) => {
                    let bezier = Arc::new(Bezier::new(self.link(), rec.name.clone(), Some(layer)));
                    bezier.set_globally_activated(rec.activated);
                    rec.activated_knob.load_into(bezier.activated_knob());
                    rec.opacity.load_into(bezier.opacity_knob());
                    rec.feather.load_into(bezier.feather_knob());
                    rec.feather_falloff.load_into(bezier.feather_falloff_knob());
                    rec.inverted.load_into(bezier.inverted_knob());
                    bezier.set_overlay_color(rec.overlay_color);

                    if rec.control_points.len() == rec.feather_points.len() {
                        let points = rec
                            .control_points
                            .iter()
                            .map(|p| p.to_point(false))
                            .collect();
                        let feather_points = rec
                            .feather_points
                            .iter()
                            .map(|p| p.to_point(true))
                            .collect();
                        bezier.load_shape(points, feather_points, rec.closed);
                    } else {
                        tracing::warn!(
                            shape = %rec.name,
                            control_points = rec.control_points.len(),
                            feather_points = rec.feather_points.len(),
                            "mismatched point lists in shape record, dropping its points"
                        );
                    }
                    layer.add_item(RotoItem::Bezier(bezier));
                }
                ItemRecord::Layer(rec) => {
                    let child_layer =
                        Arc::new(RotoLayer::new(self.link(), rec.name.clone(), Some(layer)));
                    {
                        let mut state = self.core.state.lock().expect("context lock");
                        state.layers.push(child_layer.clone());
                    }
                    layer.add_item(RotoItem::Layer(child_layer.clone()));
                    self.load_layer(&child_layer, rec)?;
                }
            }
        }
        Ok(())
    }

    /// Serialize the context to a JSON document.
    pub fn save_to_json(&self) -> RotoResult<String> {
        serde_json::to_string_pretty(&self.save()).map_err(|e| RotoError::serde(e.to_string()))
    }

    /// Load the context from a JSON document produced by
    /// [`RotoContext::save_to_json`].
    pub fn load_from_json(&self, json: &str) -> RotoResult<()> {
        let record: ContextRecord =
            serde_json::from_str(json).map_err(|e| RotoError::serde(e.to_string()))?;
        self.load(&record)
    }
}

fn link_beziers_recursively(ctx: &RotoContext, layer: &Arc<RotoLayer>) {
    for item in layer.items() {
        match item {
            RotoItem::Bezier(b) => ctx.link_bezier_to_context_knobs(&b),
            RotoItem::Layer(l) => link_beziers_recursively(ctx, &l),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/serial/records.rs"]
mod tests;
