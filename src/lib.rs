//! Rotomask is an animatable rotoscoping engine: bezier shapes with
//! per-point feather outlines, organized in a layer tree and rasterized
//! into cached alpha masks.
//!
//! The public API is context-oriented:
//!
//! - Create a [`RotoContext`] over a [`Timeline`]
//! - Build and edit shapes through [`RotoContext::make_bezier`] and the
//!   [`Bezier`] handles it returns
//! - Rasterize with [`RotoContext::render_mask`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
/// Animatable scalar parameters with master/slave linking.
pub mod knob;
pub(crate) mod shape;
/// Frame clock abstraction driving edit-time evaluation.
pub mod timeline;
pub(crate) mod tree;

/// Shape editing context: selection, policies, layer tree.
pub mod context;
/// Mask rasterization and the render cache.
pub mod render;
/// Project persistence records.
pub mod serial;

pub use crate::foundation::core::{FrameTime, Point, Rect, RectI, Vec2};
pub use crate::foundation::error::{RotoError, RotoResult};

pub use crate::context::{LinkedDefaults, RotoContext, RotoEvent};
pub use crate::knob::param::{Knob, KnobValue};
pub use crate::render::cache::{MaskCache, MaskKey};
pub use crate::render::image::MaskImage;
pub use crate::shape::bezier::{Bezier, CurveHit, SelectionTarget};
pub use crate::shape::point::{ControlPoint, TangentSide};
pub use crate::timeline::{FrameTimeline, Timeline};
pub use crate::tree::item::RotoItem;
pub use crate::tree::layer::RotoLayer;
