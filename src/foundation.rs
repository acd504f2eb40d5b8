/// Core scalar/geometry types shared across the crate.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
