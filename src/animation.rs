/// Keyframed scalar curve.
pub mod curve;
/// Two-curve animated 2D point with a static fallback.
pub mod point;
