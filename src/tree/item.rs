use std::sync::{Arc, Mutex, Weak};

use crate::context::ContextLink;
use crate::shape::bezier::Bezier;
use crate::tree::layer::RotoLayer;

/// A node of the roto tree: either a layer or a bezier shape.
///
/// The variant is closed on purpose; render order, selection and
/// serialization all dispatch over these two cases.
#[derive(Clone)]
pub enum RotoItem {
    /// A grouping layer owning ordered children.
    Layer(Arc<RotoLayer>),
    /// A drawable bezier shape.
    Bezier(Arc<Bezier>),
}

impl RotoItem {
    /// The item's current name (safe from any thread).
    pub fn name(&self) -> String {
        self.core().name()
    }

    /// Whether the item is globally activated.
    pub fn is_globally_activated(&self) -> bool {
        self.core().is_globally_activated()
    }

    /// The owning layer, `None` for roots.
    pub fn parent_layer(&self) -> Option<Arc<RotoLayer>> {
        self.core().parent_layer()
    }

    /// Nesting depth: number of parent layers above this item.
    pub fn hierarchy_level(&self) -> usize {
        self.core().hierarchy_level()
    }

    /// Whether `self` and `other` are the same node.
    pub fn same_item(&self, other: &RotoItem) -> bool {
        match (self, other) {
            (RotoItem::Layer(a), RotoItem::Layer(b)) => Arc::ptr_eq(a, b),
            (RotoItem::Bezier(a), RotoItem::Bezier(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn core(&self) -> &ItemCore {
        match self {
            RotoItem::Layer(l) => l.item_core(),
            RotoItem::Bezier(b) => b.item_core(),
        }
    }
}

/// Name, activation flag and parent back-reference shared by every item.
///
/// The parent is a weak reference: children are owned exclusively by their
/// parent layer's child list, the back-pointer never contributes to
/// lifetime.
pub(crate) struct ItemCore {
    pub(crate) ctx: ContextLink,
    state: Mutex<ItemState>,
}

struct ItemState {
    name: String,
    globally_activated: bool,
    parent: Weak<RotoLayer>,
}

impl ItemCore {
    pub(crate) fn new(ctx: ContextLink, name: String, parent: Option<&Arc<RotoLayer>>) -> Self {
        Self {
            ctx,
            state: Mutex::new(ItemState {
                name,
                globally_activated: true,
                parent: parent.map(Arc::downgrade).unwrap_or_default(),
            }),
        }
    }

    pub(crate) fn name(&self) -> String {
        self.state.lock().expect("item lock").name.clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        self.ctx.assert_edit_thread();
        self.state.lock().expect("item lock").name = name;
    }

    pub(crate) fn is_globally_activated(&self) -> bool {
        self.state.lock().expect("item lock").globally_activated
    }

    pub(crate) fn set_globally_activated(&self, activated: bool) {
        self.state.lock().expect("item lock").globally_activated = activated;
    }

    pub(crate) fn parent_layer(&self) -> Option<Arc<RotoLayer>> {
        self.state.lock().expect("item lock").parent.upgrade()
    }

    pub(crate) fn set_parent_layer(&self, parent: Option<&Arc<RotoLayer>>) {
        self.ctx.assert_edit_thread();
        self.state.lock().expect("item lock").parent =
            parent.map(Arc::downgrade).unwrap_or_default();
    }

    pub(crate) fn hierarchy_level(&self) -> usize {
        let mut level = 0;
        let mut parent = self.parent_layer();
        while let Some(layer) = parent {
            level += 1;
            parent = layer.item_core().parent_layer();
        }
        level
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tree/item.rs"]
mod tests;
