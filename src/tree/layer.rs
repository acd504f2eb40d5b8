use std::sync::{Arc, Mutex};

use crate::context::ContextLink;
use crate::shape::bezier::Bezier;
use crate::tree::item::{ItemCore, RotoItem};

/// A grouping node holding an ordered list of child items.
///
/// Children render front to back in list order; a deactivated layer hides
/// its whole subtree.
pub struct RotoLayer {
    core: ItemCore,
    items: Mutex<Vec<RotoItem>>,
}

impl RotoLayer {
    pub(crate) fn new(ctx: ContextLink, name: String, parent: Option<&Arc<RotoLayer>>) -> Self {
        Self {
            core: ItemCore::new(ctx, name, parent),
            items: Mutex::new(Vec::new()),
        }
    }

    /// The layer's current name.
    pub fn name(&self) -> String {
        self.core.name()
    }

    /// Rename the layer. Edit thread only.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core.set_name(name.into());
    }

    /// Whether the layer (and thus its subtree) is globally activated.
    pub fn is_globally_activated(&self) -> bool {
        self.core.is_globally_activated()
    }

    /// Activate or deactivate the whole subtree.
    pub fn set_globally_activated(&self, activated: bool) {
        self.core.set_globally_activated(activated);
    }

    /// The owning layer, `None` for the base layer.
    pub fn parent_layer(&self) -> Option<Arc<RotoLayer>> {
        self.core.parent_layer()
    }

    /// Snapshot of the child list, front first.
    pub fn items(&self) -> Vec<RotoItem> {
        self.items.lock().expect("layer lock").clone()
    }

    /// Number of direct children.
    pub fn items_count(&self) -> usize {
        self.items.lock().expect("layer lock").len()
    }

    /// Append `item` to the child list. Edit thread only.
    pub fn add_item(&self, item: RotoItem) {
        self.core.ctx.assert_edit_thread();
        self.items.lock().expect("layer lock").push(item);
    }

    /// Insert `item` at `index`, clamped to the list length. Edit thread only.
    pub fn insert_item(&self, index: usize, item: RotoItem) {
        self.core.ctx.assert_edit_thread();
        let mut items = self.items.lock().expect("layer lock");
        let index = index.min(items.len());
        items.insert(index, item);
    }

    /// Remove `item` from the child list if present. Edit thread only.
    pub fn remove_item(&self, item: &RotoItem) {
        self.core.ctx.assert_edit_thread();
        let mut items = self.items.lock().expect("layer lock");
        if let Some(pos) = items.iter().position(|i| i.same_item(item)) {
            items.remove(pos);
        }
    }

    /// Depth-first search of this subtree for an item named `name`.
    pub fn find_item(&self, name: &str) -> Option<RotoItem> {
        for item in self.items() {
            if item.name() == name {
                return Some(item);
            }
            if let RotoItem::Layer(layer) = &item
                && let Some(found) = layer.find_item(name)
            {
                return Some(found);
            }
        }
        None
    }

    /// Collect the beziers of this subtree in render order.
    ///
    /// Deactivated layers always hide their subtree; `only_active`
    /// additionally skips shapes whose activated knob is off at `time`.
    pub fn collect_beziers(&self, only_active: bool, time: crate::foundation::core::FrameTime) -> Vec<Arc<Bezier>> {
        let mut out = Vec::new();
        self.collect_into(only_active, time, &mut out);
        out
    }

    fn collect_into(
        &self,
        only_active: bool,
        time: crate::foundation::core::FrameTime,
        out: &mut Vec<Arc<Bezier>>,
    ) {
        for item in self.items() {
            match item {
                RotoItem::Bezier(b) => {
                    if !only_active || b.is_activated(time) {
                        out.push(b);
                    }
                }
                RotoItem::Layer(l) => {
                    if l.is_globally_activated() {
                        l.collect_into(only_active, time, out);
                    }
                }
            }
        }
    }

    pub(crate) fn item_core(&self) -> &ItemCore {
        &self.core
    }
}
