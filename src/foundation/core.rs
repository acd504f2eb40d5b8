pub use kurbo::{Point, Rect, Vec2};

/// Timeline time expressed in whole frames.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameTime(pub i64);

/// Integer pixel rectangle with exclusive right/top edges.
///
/// Used for regions of definition and regions of interest. The f64 side of
/// the geometry lives in [`kurbo::Rect`]; this type only exists where pixels
/// are addressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RectI {
    /// Left edge (inclusive).
    pub x1: i32,
    /// Bottom edge (inclusive).
    pub y1: i32,
    /// Right edge (exclusive).
    pub x2: i32,
    /// Top edge (exclusive).
    pub y2: i32,
}

impl RectI {
    /// Build a rectangle from its edges.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Smallest integer rectangle covering `r`.
    pub fn enclosing(r: Rect) -> Self {
        Self {
            x1: r.x0.floor() as i32,
            y1: r.y0.floor() as i32,
            x2: r.x1.ceil() as i32,
            y2: r.y1.ceil() as i32,
        }
    }

    /// Whether the rectangle covers no pixel.
    pub fn is_null(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Width in pixels, zero when null.
    pub fn width(self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    /// Height in pixels, zero when null.
    pub fn height(self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    /// Whether pixel `(x, y)` lies inside.
    pub fn contains(self, x: i32, y: i32) -> bool {
        self.x1 <= x && x < self.x2 && self.y1 <= y && y < self.y2
    }

    /// Union with `other`; a null side is ignored.
    pub fn merge(self, other: Self) -> Self {
        if self.is_null() {
            return other;
        }
        if other.is_null() {
            return self;
        }
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Intersection with `other`; null when disjoint.
    pub fn intersect(self, other: Self) -> Self {
        let r = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        if r.is_null() { Self::default() } else { r }
    }
}

/// Seeded FNV-1a over a byte slice, stable across runs and platforms.
pub fn stable_hash64(seed: u64, bytes: &[u8]) -> u64 {
    let mut h = 0xcbf2_9ce4_8422_2325u64 ^ seed;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01B3);
    }
    h
}
