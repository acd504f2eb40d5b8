/// Animated control points with paired tangents.
pub mod point;
/// Segment evaluation, derivatives and proximity tests.
pub mod eval;
/// The bezier shape and its editing operations.
pub mod bezier;
