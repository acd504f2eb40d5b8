//! Even-odd scanline polygon fill.
//!
//! The polygon is filled in scanline order with an extension of Bresenham's
//! line algorithm that treats y as the major axis. Edges are bucketed by
//! the scanline they start on, merged into an active list sorted by x, and
//! consumed pairwise so that the region between an odd and an even crossing
//! is filled.
//!
//! The float-to-integer edge conversion is known to misclassify some edge
//! pixels; cached renders depend on the exact pixel set it produces, so the
//! conversion is kept bit-for-bit, including the left/right test that reads
//! the y coordinate of one endpoint against the x of the other.

use std::sync::atomic::{AtomicBool, Ordering};

use kurbo::Point;

use crate::foundation::core::RectI;
use crate::render::image::MaskImage;

struct BresenhamData {
    minor_axis: i32,
    d: i32,
    m: i32,
    m1: i32,
    incr1: i32,
    incr2: i32,
}

impl BresenhamData {
    /// Set up the stepper for an edge spanning `dy` scanlines from minor
    /// coordinate `x1` to `x2`.
    ///
    /// Half a pixel is folded into the error term so that for edges moving
    /// right the stepper flips immediately, while for edges moving left it
    /// waits out a whole pixel; that picks the first pixel inside the
    /// polygon on the left edge and the first outside on the right.
    fn new(dy: i32, x1: i32, x2: i32) -> Self {
        let minor_axis = x1;
        let dx = x2 - minor_axis;
        if dx < 0 {
            let m = dx / dy;
            let m1 = m - 1;
            Self {
                minor_axis,
                m,
                m1,
                incr1: -2 * dx + 2 * dy * m1,
                incr2: -2 * dx + 2 * dy * m,
                d: 2 * m * dy - 2 * dx - 2 * dy,
            }
        } else {
            let m = dx / dy;
            let m1 = m + 1;
            Self {
                minor_axis,
                m,
                m1,
                incr1: 2 * dx - 2 * dy * m1,
                incr2: 2 * dx - 2 * dy * m,
                d: -2 * m * dy + 2 * dx,
            }
        }
    }

    fn bres_incr(&mut self) {
        if self.m1 > 0 {
            if self.d > 0 {
                self.minor_axis += self.m1;
                self.d += self.incr1;
            } else {
                self.minor_axis += self.m;
                self.d += self.incr2;
            }
        } else if self.d >= 0 {
            self.minor_axis += self.m1;
            self.d += self.incr1;
        } else {
            self.minor_axis += self.m;
            self.d += self.incr2;
        }
    }
}

struct Edge {
    /// Scanline at which the edge is retired.
    ymax: i32,
    bres: BresenhamData,
}

struct ScanLine {
    scanline: i32,
    edges: Vec<Edge>,
}

struct EdgeTable {
    ymax: i32,
    ymin: i32,
    scanlines: Vec<ScanLine>,
}

fn insert_edge(scanlines: &mut Vec<ScanLine>, edge: Edge, scanline: i32) {
    let slot = match scanlines.iter().position(|sl| sl.scanline >= scanline) {
        Some(i) if scanlines[i].scanline == scanline => i,
        Some(i) => {
            scanlines.insert(
                i,
                ScanLine {
                    scanline,
                    edges: Vec::new(),
                },
            );
            i
        }
        None => {
            scanlines.push(ScanLine {
                scanline,
                edges: Vec::new(),
            });
            scanlines.len() - 1
        }
    };
    let edges = &mut scanlines[slot].edges;
    let pos = edges
        .iter()
        .position(|e| e.bres.minor_axis >= edge.bres.minor_axis)
        .unwrap_or(edges.len());
    edges.insert(pos, edge);
}

fn build_edge_table(points: &[Point]) -> EdgeTable {
    let mut table = EdgeTable {
        ymax: i32::MIN,
        ymin: i32::MAX,
        scanlines: Vec::new(),
    };
    if points.len() < 2 {
        return table;
    }

    for w in points.windows(2) {
        let (cur, next) = (w[0], w[1]);

        let cur_is_top = next.y < cur.y;
        let (bottom_y, top_y) = if cur_is_top {
            ((next.y + 0.5).floor() as i32, (cur.y + 0.5).floor() as i32)
        } else {
            ((cur.y + 0.5).floor() as i32, (next.y + 0.5).floor() as i32)
        };
        let cur_is_left = !(next.x < cur.y);

        // horizontal edges are discarded
        if bottom_y != top_y {
            let dy = (next.y - cur.y).abs().ceil() as i32;
            let x1 = if cur_is_left { cur.x.floor() } else { cur.x.ceil() } as i32;
            let x2 = if cur_is_left { next.x.ceil() } else { next.x.floor() } as i32;
            let edge = Edge {
                // -1 so we don't produce the last scanline
                ymax: top_y - 1,
                bres: BresenhamData::new(dy, x1, x2),
            };
            insert_edge(&mut table.scanlines, edge, bottom_y);

            let (raw_top, raw_bottom) = if cur_is_top { (cur.y, next.y) } else { (next.y, cur.y) };
            table.ymax = table.ymax.max(raw_top.ceil() as i32);
            table.ymin = table.ymin.min(raw_bottom.floor() as i32);
        }
    }
    table
}

/// Fill the polygon described by `points` into the alpha channel of
/// `output` with `value`, writing only pixels inside `roi`.
///
/// Spans between odd and even edge crossings are filled; a polygon of
/// fewer than three points is a no-op. The `abort` flag is polled once per
/// scanline; returns `false` when the fill was abandoned.
pub fn fill_polygon_even_odd(
    roi: RectI,
    points: &[Point],
    value: f32,
    output: &MaskImage,
    abort: &AtomicBool,
) -> bool {
    // a polygon is at least a triangle
    if points.len() < 3 {
        return true;
    }

    let mut table = build_edge_table(points);
    let mut active: Vec<Edge> = Vec::new();
    let mut next_scanline = 0usize;

    let comps = output.components();
    let mut buffer = output.lock_buffer();

    for y in table.ymin..=table.ymax {
        if abort.load(Ordering::Relaxed) {
            return false;
        }

        // merge this scanline's new edges, keeping the list sorted by x
        if next_scanline < table.scanlines.len() && table.scanlines[next_scanline].scanline == y {
            for edge in table.scanlines[next_scanline].edges.drain(..) {
                let pos = active
                    .iter()
                    .position(|e| e.bres.minor_axis >= edge.bres.minor_axis)
                    .unwrap_or(active.len());
                active.insert(pos, edge);
            }
            next_scanline += 1;
        }

        let mut retire: Vec<usize> = Vec::new();
        let mut i = 0;
        while i + 1 < active.len() {
            let x = active[i].bres.minor_axis;
            let end = active[i + 1].bres.minor_axis;

            for xx in x..end {
                if roi.contains(xx, y) {
                    let base = output.pixel_index(xx, y) * comps;
                    buffer.pixels[base + comps - 1] = value;
                }
            }

            // step or retire both the odd and the even edge
            for j in [i, i + 1] {
                if active[j].ymax == y {
                    retire.push(j);
                } else {
                    active[j].bres.bres_incr();
                }
            }
            i += 2;
        }

        for &j in retire.iter().rev() {
            active.remove(j);
        }
        active.sort_by_key(|e| e.bres.minor_axis);
    }
    true
}

#[cfg(test)]
#[path = "../../tests/unit/render/scanline.rs"]
mod tests;
