/// Tagged item variant and the state shared by every tree node.
pub mod item;
/// Layer nodes owning ordered children.
pub mod layer;
