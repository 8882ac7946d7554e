//! Icon grid layout
//!
//! Mirrors CSS grid semantics: `gridRows` x `gridCols` equal tracks, explicit
//! 1-based `gridPosition` placements first, then the remaining icons in
//! row-major auto placement ordered by `order`. Placements that do not fit add
//! implicit rows below the declared ones, up to one extra row per visible icon.

use crate::config::{IconData, IconLayout};
use crate::constants::grid::{DEFAULT_GAP, MAX_TRACKS, PADDING};
use crate::types::Rect;

/// Placed icon; `icon` indexes the slice passed to [`GridLayout::compute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub icon: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridLayout {
    pub cells: Vec<GridCell>,
    pub rows: u32,
    pub cols: u32,
}

/// Track-level placement before pixel sizes are known
#[derive(Debug, Clone, Copy)]
struct Placement {
    icon: usize,
    row: u32,
    col: u32,
    row_span: u32,
    col_span: u32,
}

struct Occupancy {
    cols: u32,
    taken: Vec<bool>,
}

impl Occupancy {
    fn new(cols: u32) -> Self {
        Self { cols, taken: Vec::new() }
    }

    fn rows(&self) -> u32 {
        (self.taken.len() as u32).div_ceil(self.cols)
    }

    // Callers keep row and col within the bounded grid, so indices fit in usize
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    fn is_free(&self, row: u32, col: u32) -> bool {
        !self.taken.get(self.index(row, col)).copied().unwrap_or(false)
    }

    fn mark(&mut self, row: u32, col: u32, row_span: u32, col_span: u32) {
        let needed = self.index(row + row_span, 0);
        if self.taken.len() < needed {
            self.taken.resize(needed, false);
        }
        for r in row..row + row_span {
            for c in col..col + col_span {
                let index = self.index(r, c);
                self.taken[index] = true;
            }
        }
    }
}

impl GridLayout {
    /// Lay out the visible `icons` inside a `width` x `height` window
    pub fn compute(layout: &IconLayout, icons: &[IconData], width: u32, height: u32) -> Self {
        let cols = layout.grid_cols.clamp(1, MAX_TRACKS);
        let mut occupancy = Occupancy::new(cols);
        let mut placements = Vec::new();

        let mut visible: Vec<usize> = (0..icons.len()).filter(|&i| icons[i].is_visible).collect();
        // Stable: equal `order` keeps file order
        visible.sort_by_key(|&i| icons[i].order.unwrap_or(0));

        // Explicit rows past this are pulled back so a stray row number cannot
        // grow the occupancy map without bound
        let visible_count = u32::try_from(visible.len()).unwrap_or(u32::MAX);
        let row_limit = layout.grid_rows.clamp(1, MAX_TRACKS).saturating_add(visible_count);

        let (explicit, auto): (Vec<usize>, Vec<usize>) =
            visible.into_iter().partition(|&i| icons[i].grid_position.is_some());

        for icon in explicit {
            let Some(pos) = icons[icon].grid_position else { continue };
            let col = pos.col.max(1) - 1;
            let col = col.min(cols - 1);
            let col_span = pos.col_span.max(1).min(cols - col);
            let row = (pos.row.max(1) - 1).min(row_limit - 1);
            let row_span = pos.row_span.max(1).min(row_limit - row);
            occupancy.mark(row, col, row_span, col_span);
            placements.push(Placement { icon, row, col, row_span, col_span });
        }

        let mut cursor = 0u32;
        for icon in auto {
            loop {
                let (row, col) = (cursor / cols, cursor % cols);
                cursor += 1;
                if occupancy.is_free(row, col) {
                    occupancy.mark(row, col, 1, 1);
                    placements.push(Placement { icon, row, col, row_span: 1, col_span: 1 });
                    break;
                }
            }
        }

        let rows = layout.grid_rows.clamp(1, MAX_TRACKS).max(occupancy.rows());
        let gap = layout.gap.unwrap_or(DEFAULT_GAP);
        let track_w = track_size(width, cols, gap);
        let track_h = track_size(height, rows, gap);

        let cells = placements
            .into_iter()
            .map(|p| GridCell {
                icon: p.icon,
                rect: Rect::new(
                    track_offset(p.col, track_w, gap),
                    track_offset(p.row, track_h, gap),
                    span_size(p.col_span, track_w, gap),
                    span_size(p.row_span, track_h, gap),
                ),
            })
            .collect();

        Self { cells, rows, cols }
    }

    /// Icon under window-relative point `(x, y)`
    pub fn hit_test(&self, x: i32, y: i32) -> Option<usize> {
        self.cells
            .iter()
            .find(|cell| cell.rect.contains(x, y))
            .map(|cell| cell.icon)
    }
}

fn track_size(total: u32, tracks: u32, gap: u32) -> u32 {
    let usable = total
        .saturating_sub(PADDING * 2)
        .saturating_sub(gap.saturating_mul(tracks - 1));
    usable / tracks
}

/// Pixel offset of the track at `index`, pinned to the i32 coordinate range
fn track_offset(index: u32, track: u32, gap: u32) -> i32 {
    let offset = track.saturating_add(gap).saturating_mul(index).saturating_add(PADDING);
    i32::try_from(offset).unwrap_or(i32::MAX)
}

fn span_size(span: u32, track: u32, gap: u32) -> u32 {
    track.saturating_mul(span).saturating_add(gap.saturating_mul(span - 1))
}
