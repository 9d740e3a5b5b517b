//! Headless vertical virtualization over variable-height rows.
//!
//! Sizes come from a caller-supplied height function and are cached together
//! with prefix offsets. The cache is valid up to a watermark: any change to a
//! row height must call [`Virtualizer::invalidate_from`] with the first
//! affected index, otherwise rows below it keep stale offsets and overlap.

use std::ops::Range;

/// Where the target row should land when scrolling to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Start,
    Center,
    End,
    /// Scroll the minimum distance that makes the row fully visible
    #[default]
    Auto,
}

/// A materialized row: its index and vertical placement in content space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: u32,
    pub size: u32,
}

impl VirtualItem {
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Virtualizer {
    count: usize,
    overscan: usize,
    viewport: u32,
    scroll_offset: u32,
    sizes: Vec<u32>,
    starts: Vec<u32>,
    /// Number of leading rows whose size and start are known to be current
    measured: usize,
    revision: u64,
}

impl Virtualizer {
    pub fn new(overscan: usize) -> Self {
        Self {
            overscan,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Change the row count. Rows past the new count are forgotten; rows
    /// added at the end are measured on the next [`measure`](Self::measure).
    pub fn set_count(&mut self, count: usize) {
        if count != self.count {
            self.count = count;
            if self.measured > count {
                self.truncate(count);
            }
        }
    }

    /// Discard cached sizes and offsets from `index` onward
    pub fn invalidate_from(&mut self, index: usize) {
        if index < self.measured {
            self.truncate(index);
        }
    }

    pub fn invalidate_all(&mut self) {
        self.truncate(0);
    }

    fn truncate(&mut self, len: usize) {
        self.measured = len.min(self.measured);
        self.sizes.truncate(self.measured);
        self.starts.truncate(self.measured);
    }

    /// Bring the cache up to date. Only rows at or after the watermark are
    /// queried. Zero heights are measured as 1 so every row stays hit-testable.
    pub fn measure(&mut self, height: impl Fn(usize) -> u32) {
        let mut next_start = self.total_extent();
        for index in self.measured..self.count {
            let size = height(index).max(1);
            self.sizes.push(size);
            self.starts.push(next_start);
            next_start = next_start.saturating_add(size);
        }
        self.measured = self.count;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    pub fn is_measured(&self) -> bool {
        self.measured == self.count
    }

    /// Rows that can be answered for; equals `count` once measured
    fn live(&self) -> usize {
        self.measured.min(self.count)
    }

    pub fn total_extent(&self) -> u32 {
        let live = self.live();
        if live == 0 {
            return 0;
        }
        self.starts[live - 1].saturating_add(self.sizes[live - 1])
    }

    pub fn viewport(&self) -> u32 {
        self.viewport
    }

    pub fn set_viewport(&mut self, height: u32) {
        self.viewport = height;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    pub fn max_scroll(&self) -> u32 {
        self.total_extent().saturating_sub(self.viewport)
    }

    pub fn set_scroll_offset(&mut self, offset: u32) {
        self.scroll_offset = offset.min(self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = (self.scroll_offset as i64).saturating_add(delta).max(0);
        self.set_scroll_offset(u32::try_from(target).unwrap_or(u32::MAX));
    }

    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        if index >= self.live() {
            return None;
        }
        Some(VirtualItem {
            index,
            start: self.starts[index],
            size: self.sizes[index],
        })
    }

    /// Row covering content offset `y`, if any
    pub fn index_at_offset(&self, y: u32) -> Option<usize> {
        let live = self.live();
        if live == 0 || y >= self.total_extent() {
            return None;
        }
        let after = self.starts[..live].partition_point(|&start| start <= y);
        Some(after.saturating_sub(1))
    }

    /// Row under viewport-relative offset `y`
    pub fn index_at_viewport_offset(&self, y: u32) -> Option<usize> {
        if y >= self.viewport {
            return None;
        }
        self.index_at_offset(self.scroll_offset.saturating_add(y))
    }

    /// Indices intersecting the viewport, without overscan
    pub fn visible_range(&self) -> Range<usize> {
        let live = self.live();
        if live == 0 || self.viewport == 0 {
            return 0..0;
        }
        let Some(first) = self.index_at_offset(self.scroll_offset) else {
            return 0..0;
        };
        let bottom = self.scroll_offset.saturating_add(self.viewport - 1);
        let last = self.index_at_offset(bottom).unwrap_or(live - 1);
        first..last + 1
    }

    /// Indices to materialize: the visible range widened by overscan
    pub fn render_range(&self) -> Range<usize> {
        let visible = self.visible_range();
        if visible.is_empty() {
            return visible;
        }
        let start = visible.start.saturating_sub(self.overscan);
        let end = (visible.end + self.overscan).min(self.live());
        start..end
    }

    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        self.render_range().filter_map(|i| self.item(i)).collect()
    }

    /// Scroll so row `index` is placed per `align`. Out-of-range indices are
    /// clamped to the last row.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) {
        let live = self.live();
        if live == 0 {
            self.scroll_offset = 0;
            return;
        }
        let Some(item) = self.item(index.min(live - 1)) else {
            return;
        };
        let fits = item.size <= self.viewport;
        let offset = match align {
            Align::Start => item.start,
            Align::End => item.end().saturating_sub(self.viewport),
            Align::Center => {
                let slack = self.viewport.saturating_sub(item.size) / 2;
                item.start.saturating_sub(slack)
            }
            Align::Auto => {
                let view_end = self.scroll_offset.saturating_add(self.viewport);
                if item.start < self.scroll_offset || !fits {
                    item.start
                } else if item.end() > view_end {
                    item.end().saturating_sub(self.viewport)
                } else {
                    self.scroll_offset
                }
            }
        };
        self.set_scroll_offset(offset);
    }

    /// Decoration changed without any height change; renderers compare the
    /// revision to decide whether to repaint.
    pub fn request_reflow(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
