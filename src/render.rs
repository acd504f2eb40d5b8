/// Mask raster with a per-pixel rendered bitmap.
pub mod image;
/// Keyed cache of rendered masks.
pub mod cache;
/// Even-odd scanline polygon fill.
pub mod scanline;
/// The mask render entry point.
pub mod mask;
