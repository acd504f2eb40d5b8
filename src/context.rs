use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::ThreadId;

use crate::foundation::core::{FrameTime, RectI};
use crate::foundation::error::RotoResult;
use crate::knob::param::Knob;
use crate::render::cache::MaskCache;
use crate::shape::bezier::{Bezier, CurveHit};
use crate::timeline::Timeline;
use crate::tree::item::RotoItem;
use crate::tree::layer::RotoLayer;

/// Notification emitted by the context after a mutation has been committed
/// and every lock released.
#[derive(Clone, Debug, PartialEq)]
pub enum RotoEvent {
    /// A shape gained (or re-asserted) a keyframe.
    KeyframeSet {
        /// Name of the shape.
        item: String,
        /// The keyed time.
        time: FrameTime,
    },
    /// A shape lost a keyframe.
    KeyframeRemoved {
        /// Name of the shape.
        item: String,
        /// The removed time.
        time: FrameTime,
    },
    /// The linked selection changed.
    SelectionChanged,
}

type EventListener = Box<dyn Fn(&RotoEvent) + Send + Sync>;

/// The context-level knobs mirroring the current selection.
///
/// While shapes are linked these act as masters: editing one of them edits
/// every linked shape. They are disabled whenever the selection is empty.
pub struct LinkedDefaults {
    /// Master for the per-shape activated knobs.
    pub activated: Arc<Knob<bool>>,
    /// Master for the per-shape opacity knobs.
    pub opacity: Arc<Knob<f64>>,
    /// Master for the per-shape feather distance knobs.
    pub feather: Arc<Knob<i32>>,
    /// Master for the per-shape feather falloff knobs.
    pub feather_falloff: Arc<Knob<f64>>,
    /// Master for the per-shape inverted knobs.
    pub inverted: Arc<Knob<bool>>,
}

impl LinkedDefaults {
    fn new() -> Self {
        let d = Self {
            activated: Arc::new(Knob::new(true)),
            opacity: Arc::new(Knob::new(1.0)),
            feather: Arc::new(Knob::new(0)),
            feather_falloff: Arc::new(Knob::new(1.0)),
            inverted: Arc::new(Knob::new(false)),
        };
        d.set_all_enabled(false);
        d
    }

    fn set_all_enabled(&self, enabled: bool) {
        self.activated.set_enabled(enabled);
        self.opacity.set_enabled(enabled);
        self.feather.set_enabled(enabled);
        self.feather_falloff.set_enabled(enabled);
        self.inverted.set_enabled(enabled);
    }

    fn set_all_dirty(&self, dirty: bool) {
        self.activated.set_dirty(dirty);
        self.opacity.set_dirty(dirty);
        self.feather.set_dirty(dirty);
        self.feather_falloff.set_dirty(dirty);
        self.inverted.set_dirty(dirty);
    }
}

pub(crate) struct ContextState {
    pub(crate) layers: Vec<Arc<RotoLayer>>,
    pub(crate) selected: Vec<RotoItem>,
    pub(crate) auto_keying: bool,
    pub(crate) feather_link: bool,
    pub(crate) ripple_edit: bool,
    counters: HashMap<String, u32>,
}

impl ContextState {
    fn unique_name(&mut self, base: &str) -> String {
        let n = self.counters.entry(base.to_string()).or_insert(0);
        *n += 1;
        format!("{base} {n}")
    }

    /// The most deeply nested layer of the selection: a selected layer
    /// itself, or the parent of a selected shape.
    fn find_deepest_selected_layer(&self) -> Option<Arc<RotoLayer>> {
        let mut min_level: i64 = -1;
        let mut min_layer = None;
        for item in &self.selected {
            let level = item.hierarchy_level() as i64;
            if level > min_level {
                min_layer = match item {
                    RotoItem::Layer(l) => Some(l.clone()),
                    RotoItem::Bezier(b) => b.parent_layer(),
                };
                min_level = level;
            }
        }
        min_layer
    }
}

pub(crate) struct ContextCore {
    edit_thread: ThreadId,
    timeline: Arc<dyn Timeline>,
    pub(crate) state: Mutex<ContextState>,
    age: AtomicU64,
    defaults: LinkedDefaults,
    listeners: Mutex<Vec<EventListener>>,
    pub(crate) cache: MaskCache,
}

impl ContextCore {
    pub(crate) fn assert_edit_thread(&self) {
        assert_eq!(
            std::thread::current().id(),
            self.edit_thread,
            "roto items may only be edited from the thread that created their context"
        );
    }

    pub(crate) fn bump_age(&self) {
        self.age.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn notify(&self, event: &RotoEvent) {
        let listeners = self.listeners.lock().expect("context lock");
        for l in listeners.iter() {
            l(event);
        }
    }
}

/// Weak back-reference handed to every item so shape edits can consult the
/// editing policies, the timeline and the notification plumbing without
/// keeping the context alive.
#[derive(Clone)]
pub(crate) struct ContextLink(Weak<ContextCore>);

impl ContextLink {
    fn core(&self) -> RotoResult<Arc<ContextCore>> {
        self.0.upgrade().ok_or(crate::foundation::error::RotoError::ContextDropped)
    }

    pub(crate) fn assert_edit_thread(&self) {
        if let Some(core) = self.0.upgrade() {
            core.assert_edit_thread();
        }
    }

    pub(crate) fn auto_keying(&self) -> RotoResult<bool> {
        Ok(self.core()?.state.lock().expect("context lock").auto_keying)
    }

    pub(crate) fn feather_link(&self) -> RotoResult<bool> {
        Ok(self.core()?.state.lock().expect("context lock").feather_link)
    }

    pub(crate) fn ripple_edit(&self) -> RotoResult<bool> {
        Ok(self.core()?.state.lock().expect("context lock").ripple_edit)
    }

    pub(crate) fn current_time(&self) -> RotoResult<FrameTime> {
        Ok(self.core()?.timeline.current_frame())
    }

    pub(crate) fn bump_age(&self) {
        if let Some(core) = self.0.upgrade() {
            core.bump_age();
        }
    }

    pub(crate) fn notify(&self, event: RotoEvent) {
        if let Some(core) = self.0.upgrade() {
            core.notify(&event);
        }
    }
}

/// The editing context: the item tree, the editing policies, the linked
/// selection and the mask render cache.
///
/// A context is created with a base layer and always keeps it. Mutations
/// are restricted to the thread that created the context; reads, rendering
/// and cancellation are safe from any thread through cloned handles.
#[derive(Clone)]
pub struct RotoContext {
    pub(crate) core: Arc<ContextCore>,
}

impl RotoContext {
    /// A fresh context over `timeline`, holding only its base layer.
    pub fn new(timeline: Arc<dyn Timeline>) -> Self {
        let ctx = Self {
            core: Arc::new(ContextCore {
                edit_thread: std::thread::current().id(),
                timeline,
                state: Mutex::new(ContextState {
                    layers: Vec::new(),
                    selected: Vec::new(),
                    auto_keying: true,
                    feather_link: true,
                    ripple_edit: false,
                    counters: HashMap::new(),
                }),
                age: AtomicU64::new(0),
                defaults: LinkedDefaults::new(),
                listeners: Mutex::new(Vec::new()),
                cache: MaskCache::new(),
            }),
        };
        ctx.add_layer();
        ctx
    }

    pub(crate) fn link(&self) -> ContextLink {
        ContextLink(Arc::downgrade(&self.core))
    }

    /// Append a new layer under the deepest selected layer (or the base
    /// layer), naming it `Layer N`.
    pub fn add_layer(&self) -> Arc<RotoLayer> {
        self.core.assert_edit_thread();
        let layer = {
            let mut state = self.core.state.lock().expect("context lock");
            let name = state.unique_name("Layer");
            let parent = state
                .find_deepest_selected_layer()
                .or_else(|| state.layers.first().cloned());
            let layer = Arc::new(RotoLayer::new(self.link(), name, parent.as_ref()));
            if let Some(p) = &parent {
                p.add_item(RotoItem::Layer(layer.clone()));
            }
            state.layers.push(layer.clone());
            layer
        };
        self.core.bump_age();
        layer
    }

    /// Create a new bezier named `base_name N` with a first control point
    /// at `(x, y)`, parented under the deepest selected layer.
    pub fn make_bezier(&self, x: f64, y: f64, base_name: &str) -> RotoResult<Arc<Bezier>> {
        self.core.assert_edit_thread();
        let (name, parent) = {
            let mut state = self.core.state.lock().expect("context lock");
            (
                state.unique_name(base_name),
                state
                    .find_deepest_selected_layer()
                    .or_else(|| state.layers.first().cloned()),
            )
        };
        let parent = match parent {
            Some(p) => p,
            None => self.add_layer(),
        };
        let bezier = Arc::new(Bezier::new(self.link(), name, Some(&parent)));
        bezier.add_control_point(x, y)?;
        parent.add_item(RotoItem::Bezier(bezier.clone()));
        self.core.bump_age();
        Ok(bezier)
    }

    /// Remove `bezier` from its parent layer.
    pub fn remove_bezier(&self, bezier: &Arc<Bezier>) {
        self.remove_item(&RotoItem::Bezier(bezier.clone()));
    }

    /// Remove `item` from the tree. The base layer cannot be removed.
    pub fn remove_item(&self, item: &RotoItem) {
        self.core.assert_edit_thread();
        let Some(parent) = item.parent_layer() else {
            return;
        };
        parent.remove_item(item);
        item.core().set_parent_layer(None);
        if let RotoItem::Layer(layer) = item {
            let mut subtree = Vec::new();
            collect_layers(layer, &mut subtree);
            let mut state = self.core.state.lock().expect("context lock");
            state
                .layers
                .retain(|l| !subtree.iter().any(|s| Arc::ptr_eq(l, s)));
        }
        self.core.bump_age();
    }

    /// The layer everything ultimately nests under.
    pub fn base_layer(&self) -> Arc<RotoLayer> {
        self.core.state.lock().expect("context lock").layers[0].clone()
    }

    /// Snapshot of every layer of the tree, base layer first.
    pub fn layers(&self) -> Vec<Arc<RotoLayer>> {
        self.core.state.lock().expect("context lock").layers.clone()
    }

    /// Enable or disable keyframing on edit.
    pub fn set_auto_keying_enabled(&self, enabled: bool) {
        self.core.assert_edit_thread();
        self.core.state.lock().expect("context lock").auto_keying = enabled;
    }

    /// Whether edits key automatically.
    pub fn is_auto_keying_enabled(&self) -> bool {
        self.core.state.lock().expect("context lock").auto_keying
    }

    /// Enable or disable dragging feather points along with their control
    /// points.
    pub fn set_feather_link_enabled(&self, enabled: bool) {
        self.core.assert_edit_thread();
        self.core.state.lock().expect("context lock").feather_link = enabled;
    }

    /// Whether feather points follow their control points.
    pub fn is_feather_link_enabled(&self) -> bool {
        self.core.state.lock().expect("context lock").feather_link
    }

    /// Enable or disable repeating edits onto every keyframe.
    pub fn set_ripple_edit_enabled(&self, enabled: bool) {
        self.core.assert_edit_thread();
        self.core.state.lock().expect("context lock").ripple_edit = enabled;
    }

    /// Whether edits ripple across all keyframes.
    pub fn is_ripple_edit_enabled(&self) -> bool {
        self.core.state.lock().expect("context lock").ripple_edit
    }

    /// The playhead time of the attached timeline.
    pub fn current_time(&self) -> FrameTime {
        self.core.timeline.current_frame()
    }

    /// Strictly increasing counter bumped by every tree or shape mutation.
    pub fn age(&self) -> u64 {
        self.core.age.load(Ordering::SeqCst)
    }

    /// The knobs mirroring the linked selection.
    pub fn linked_knobs(&self) -> &LinkedDefaults {
        &self.core.defaults
    }

    /// Register a listener invoked after every committed mutation event.
    pub fn on_event(&self, listener: impl Fn(&RotoEvent) + Send + Sync + 'static) {
        self.core
            .listeners
            .lock()
            .expect("context lock")
            .push(Box::new(listener));
    }

    /// Snapshot of the linked selection.
    pub fn selected_items(&self) -> Vec<RotoItem> {
        self.core.state.lock().expect("context lock").selected.clone()
    }

    /// Select `bezier`: its knobs are seeded into the context knobs and
    /// then slaved to them, so editing the context knobs edits every
    /// selected shape at once.
    pub fn link_bezier_to_context_knobs(&self, bezier: &Arc<Bezier>) {
        self.core.assert_edit_thread();
        {
            let mut state = self.core.state.lock().expect("context lock");
            let defaults = &self.core.defaults;

            if state.selected.is_empty() {
                defaults.set_all_enabled(true);
            }

            // the context knobs take the values of the last linked shape
            defaults.activated.clone_from_knob(bezier.activated_knob());
            defaults.opacity.clone_from_knob(bezier.opacity_knob());
            defaults.feather.clone_from_knob(bezier.feather_knob());
            defaults
                .feather_falloff
                .clone_from_knob(bezier.feather_falloff_knob());
            defaults.inverted.clone_from_knob(bezier.inverted_knob());

            bezier.activated_knob().slave_to(&defaults.activated);
            bezier.opacity_knob().slave_to(&defaults.opacity);
            bezier.feather_knob().slave_to(&defaults.feather);
            bezier
                .feather_falloff_knob()
                .slave_to(&defaults.feather_falloff);
            bezier.inverted_knob().slave_to(&defaults.inverted);

            // with several shapes linked the displayed values are no longer
            // representative of the whole selection
            if !state.selected.is_empty() {
                defaults.set_all_dirty(true);
            }

            let item = RotoItem::Bezier(bezier.clone());
            if !state.selected.iter().any(|i| i.same_item(&item)) {
                state.selected.push(item);
            }
        }
        self.core.notify(&RotoEvent::SelectionChanged);
    }

    /// Deselect `bezier`, restoring its own knob state.
    pub fn unlink_bezier_from_context_knobs(&self, bezier: &Arc<Bezier>) {
        self.core.assert_edit_thread();
        {
            let mut state = self.core.state.lock().expect("context lock");
            let item = RotoItem::Bezier(bezier.clone());
            let Some(pos) = state.selected.iter().position(|i| i.same_item(&item)) else {
                return;
            };
            state.selected.remove(pos);

            bezier.activated_knob().unslave();
            bezier.opacity_knob().unslave();
            bezier.feather_knob().unslave();
            bezier.feather_falloff_knob().unslave();
            bezier.inverted_knob().unslave();

            let defaults = &self.core.defaults;
            if state.selected.len() <= 1 {
                defaults.set_all_dirty(false);
            }
            if state.selected.is_empty() {
                defaults.set_all_enabled(false);
            }
        }
        self.core.notify(&RotoEvent::SelectionChanged);
    }

    /// Key every selected shape (recursing into selected layers) at the
    /// playhead time.
    pub fn set_keyframe_on_selected_curves(&self) -> RotoResult<()> {
        self.core.assert_edit_thread();
        let time = self.current_time();
        for item in self.selected_items() {
            match item {
                RotoItem::Bezier(b) => b.set_keyframe(time)?,
                RotoItem::Layer(l) => add_or_remove_key_recursively(&l, time, true)?,
            }
        }
        Ok(())
    }

    /// Remove the keyframe at the playhead time from every selected shape.
    pub fn remove_keyframe_on_selected_curves(&self) -> RotoResult<()> {
        self.core.assert_edit_thread();
        let time = self.current_time();
        for item in self.selected_items() {
            match item {
                RotoItem::Bezier(b) => b.remove_keyframe(time)?,
                RotoItem::Layer(l) => add_or_remove_key_recursively(&l, time, false)?,
            }
        }
        Ok(())
    }

    /// Seek the timeline to the nearest keyframe of the selection before
    /// the playhead, if there is one.
    pub fn go_to_previous_keyframe(&self) {
        self.core.assert_edit_thread();
        let time = self.current_time();
        let mut nearest = None;
        for item in self.selected_items() {
            nearest_keyframe_in_item(&item, time, true, &mut nearest);
        }
        if let Some(t) = nearest {
            self.core.timeline.seek_frame(t);
        }
    }

    /// Seek the timeline to the nearest keyframe of the selection after
    /// the playhead, if there is one.
    pub fn go_to_next_keyframe(&self) {
        self.core.assert_edit_thread();
        let time = self.current_time();
        let mut nearest = None;
        for item in self.selected_items() {
            nearest_keyframe_in_item(&item, time, false, &mut nearest);
        }
        if let Some(t) = nearest {
            self.core.timeline.seek_frame(t);
        }
    }

    /// The selected shapes, recursing into selected layers.
    pub fn selected_curves(&self) -> Vec<Arc<Bezier>> {
        let time = self.current_time();
        let mut ret = Vec::new();
        for item in self.selected_items() {
            match item {
                RotoItem::Bezier(b) => ret.push(b),
                RotoItem::Layer(l) => ret.extend(l.collect_beziers(false, time)),
            }
        }
        ret
    }

    /// Every activated shape of the tree in render order, front to back.
    pub fn curves_by_render_order(&self) -> Vec<Arc<Bezier>> {
        let time = self.current_time();
        let base = {
            let state = self.core.state.lock().expect("context lock");
            state.layers.first().cloned()
        };
        base.map(|l| l.collect_beziers(true, time)).unwrap_or_default()
    }

    /// The layer named `name`, wherever it nests.
    pub fn get_layer_by_name(&self, name: &str) -> Option<Arc<RotoLayer>> {
        self.layers().into_iter().find(|l| l.name() == name)
    }

    /// The item named `name`, layer or shape.
    pub fn get_item_by_name(&self, name: &str) -> Option<RotoItem> {
        for layer in self.layers() {
            if layer.name() == name {
                return Some(RotoItem::Layer(layer));
            }
            if let Some(item) = layer.find_item(name) {
                return Some(item);
            }
        }
        None
    }

    /// Hit-test every shape of the tree at the playhead; the first curve
    /// within `acceptance` of `(x, y)` wins.
    pub fn is_nearby_bezier(
        &self,
        x: f64,
        y: f64,
        acceptance: f64,
    ) -> RotoResult<Option<(Arc<Bezier>, CurveHit)>> {
        for layer in self.layers() {
            for item in layer.items() {
                if let RotoItem::Bezier(b) = item
                    && let Some(hit) = b.is_point_on_curve(x, y, acceptance)?
                {
                    return Ok(Some((b, hit)));
                }
            }
        }
        Ok(None)
    }

    /// Union of the pixel bounding boxes of every finished, activated
    /// shape at `time`. Null when nothing renders.
    pub fn mask_region_of_definition(&self, time: FrameTime) -> RectI {
        let mut rod = RectI::default();
        for layer in self.layers() {
            for item in layer.items() {
                if let RotoItem::Bezier(b) = item
                    && b.is_activated(time)
                    && b.is_finished()
                {
                    rod = rod.merge(RectI::enclosing(b.bounding_box(time)));
                }
            }
        }
        rod
    }
}

fn collect_layers(layer: &Arc<RotoLayer>, out: &mut Vec<Arc<RotoLayer>>) {
    out.push(layer.clone());
    for item in layer.items() {
        if let RotoItem::Layer(l) = item {
            collect_layers(&l, out);
        }
    }
}

fn add_or_remove_key_recursively(layer: &Arc<RotoLayer>, time: FrameTime, add: bool) -> RotoResult<()> {
    for item in layer.items() {
        match item {
            RotoItem::Bezier(b) => {
                if add {
                    b.set_keyframe(time)?;
                } else {
                    b.remove_keyframe(time)?;
                }
            }
            RotoItem::Layer(l) => add_or_remove_key_recursively(&l, time, add)?,
        }
    }
    Ok(())
}

fn nearest_keyframe_in_item(
    item: &RotoItem,
    time: FrameTime,
    previous: bool,
    nearest: &mut Option<FrameTime>,
) {
    match item {
        RotoItem::Bezier(b) => {
            let candidate = if previous {
                b.previous_keyframe_time(time)
            } else {
                b.next_keyframe_time(time)
            };
            if let Some(t) = candidate {
                let better = match *nearest {
                    None => true,
                    Some(n) => {
                        if previous {
                            t > n
                        } else {
                            t < n
                        }
                    }
                };
                if better {
                    *nearest = Some(t);
                }
            }
        }
        RotoItem::Layer(l) => {
            for child in l.items() {
                nearest_keyframe_in_item(&child, time, previous, nearest);
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/context/core.rs"]
mod tests;
