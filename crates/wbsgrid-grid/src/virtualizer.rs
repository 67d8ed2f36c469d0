//! Fixed-height row virtualizer.
//!
//! Only rows intersecting the viewport, plus `overscan` rows on each side,
//! are materialized. The scrollable height is always `row_count × row_height`
//! so the native scrollbar reflects the full list.

use serde::Serialize;
use std::ops::Range;

/// A materialized row slot
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f64,
    pub size: f64,
}

#[derive(Clone, Debug)]
pub struct Virtualizer {
    row_count: usize,
    row_height: f64,
    overscan: usize,
    viewport_height: f64,
    scroll_top: f64,
    measured: bool,
}

impl Virtualizer {
    pub fn new(row_height: f64, overscan: usize) -> Self {
        Self {
            row_count: 0,
            row_height: row_height.max(1.0),
            overscan,
            viewport_height: 0.0,
            scroll_top: 0.0,
            measured: false,
        }
    }

    /// Change the row count; layout must be measured again
    pub fn set_row_count(&mut self, count: usize) {
        self.row_count = count;
        self.measured = false;
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height.max(0.0);
        self.scroll_top = self.clamp_scroll(self.scroll_top);
    }

    /// Update scroll position; returns the clamped value
    pub fn set_scroll_top(&mut self, top: f64) -> f64 {
        self.scroll_top = self.clamp_scroll(top);
        self.scroll_top
    }

    fn clamp_scroll(&self, top: f64) -> f64 {
        let max = (self.total_height() - self.viewport_height).max(0.0);
        if top.is_finite() {
            top.clamp(0.0, max)
        } else {
            0.0
        }
    }

    /// Mark layout as measured (the forced render pass has run)
    pub fn measure(&mut self) {
        self.measured = true;
    }

    pub fn is_measured(&self) -> bool {
        self.measured
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn total_height(&self) -> f64 {
        self.row_count as f64 * self.row_height
    }

    /// Index range to materialize
    pub fn visible_range(&self) -> Range<usize> {
        if self.row_count == 0 {
            return 0..0;
        }
        let first = (self.scroll_top / self.row_height).floor() as usize;
        let last = ((self.scroll_top + self.viewport_height) / self.row_height).ceil() as usize;
        let start = first.saturating_sub(self.overscan).min(self.row_count);
        let end = (last + self.overscan).min(self.row_count);
        start..end.max(start)
    }

    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        self.visible_range()
            .map(|index| VirtualItem {
                index,
                start: index as f64 * self.row_height,
                size: self.row_height,
            })
            .collect()
    }
}
