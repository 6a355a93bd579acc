//! Vertical stacked page layout.
//!
//! Pages are placed top to bottom in document order with a fixed gap above
//! the first page, between pages and below the last one. Each page is
//! centered horizontally inside a canvas as wide as the widest page plus a
//! gap on either side.

use crate::geometry::{Rect, Size};

pub const DEFAULT_PAGE_GAP: i32 = 10;

/// Canvas size reported while no pages are laid out.
pub const PLACEHOLDER_CANVAS: Size = Size::new(100, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    gap: i32,
    entries: Vec<LayoutEntry>,
    canvas: Size,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_GAP)
    }
}

impl PageLayout {
    pub fn new(gap: i32) -> Self {
        Self { gap: gap.max(0), entries: Vec::new(), canvas: PLACEHOLDER_CANVAS }
    }

    /// Replaces the layout with one entry per page extent, in order.
    pub fn set_pages<I>(&mut self, extents: I)
    where
        I: IntoIterator<Item = Size>,
    {
        self.entries.clear();

        let mut y = self.gap;
        let mut max_width = 0;

        for extent in extents {
            let width = extent.width.max(0);
            let height = extent.height.max(0);

            self.entries.push(LayoutEntry { top: y, width, height });
            y += height + self.gap;
            max_width = max_width.max(width);
        }

        self.canvas = if self.entries.is_empty() {
            PLACEHOLDER_CANVAS
        } else {
            Size::new((max_width + self.gap * 2).max(1), y.max(1))
        };

        log::debug!(
            "layout rebuilt: {} pages, canvas {}x{}",
            self.entries.len(),
            self.canvas.width,
            self.canvas.height
        );
    }

    pub fn gap(&self) -> i32 {
        self.gap
    }

    pub fn page_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn page_top(&self, index: usize) -> Option<i32> {
        self.entries.get(index).map(|entry| entry.top)
    }

    /// Draw region of a page, or [`Rect::EMPTY`] when `index` is out of range.
    pub fn page_region(&self, index: usize) -> Rect {
        let Some(entry) = self.entries.get(index) else {
            return Rect::EMPTY;
        };

        let x = ((self.canvas.width - entry.width) / 2).max(0);
        Rect::new(x, entry.top, entry.width, entry.height)
    }

    /// Index of the last page whose top is at or above `y`; `0` if none is.
    pub fn page_at_y(&self, y: i32) -> usize {
        self.entries.iter().rposition(|entry| y >= entry.top).unwrap_or(0)
    }

    pub fn regions(&self) -> impl Iterator<Item = (usize, Rect)> + '_ {
        (0..self.entries.len()).map(move |index| (index, self.page_region(index)))
    }

    /// Pages with any part inside the vertical band `[top, bottom]`.
    pub fn visible_pages(&self, top: i32, bottom: i32) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().enumerate().filter_map(move |(index, entry)| {
            let hidden = entry.top + entry.height < top || entry.top > bottom;
            (!hidden).then_some(index)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout_of(sizes: &[(i32, i32)]) -> PageLayout {
        let mut layout = PageLayout::new(10);
        layout.set_pages(sizes.iter().map(|&(w, h)| Size::new(w, h)));
        layout
    }

    #[test]
    fn single_page_is_framed_by_gaps() {
        let layout = layout_of(&[(600, 800)]);

        assert_eq!(layout.canvas_size(), Size::new(620, 820));
        assert_eq!(layout.page_region(0), Rect::new(10, 10, 600, 800));
    }

    #[test]
    fn two_pages_stack_with_gap() {
        let layout = layout_of(&[(400, 600), (500, 600)]);

        assert_eq!(layout.page_region(0).y, 10);
        assert_eq!(layout.page_region(1).y, 620);
        assert_eq!(layout.canvas_size().height, 1230);
    }

    #[test]
    fn narrower_pages_are_centered() {
        let layout = layout_of(&[(400, 600), (500, 600)]);

        assert_eq!(layout.canvas_size().width, 520);
        assert_eq!(layout.page_region(0).x, 60);
        assert_eq!(layout.page_region(1).x, 10);
    }

    #[test]
    fn boundary_belongs_to_the_page_below() {
        let layout = layout_of(&[(400, 600), (500, 600)]);

        assert_eq!(layout.page_at_y(615), 0);
        assert_eq!(layout.page_at_y(619), 0);
        assert_eq!(layout.page_at_y(620), 1);
    }

    #[test]
    fn empty_layout_uses_placeholder() {
        let layout = layout_of(&[]);

        assert_eq!(layout.canvas_size(), PLACEHOLDER_CANVAS);
        assert_eq!(layout.page_region(0), Rect::EMPTY);
        assert!(layout.page_region(0).is_empty());
        assert_eq!(layout.page_at_y(500), 0);
    }

    #[test]
    fn out_of_range_region_is_empty() {
        let layout = layout_of(&[(100, 100)]);
        assert_eq!(layout.page_region(1), Rect::EMPTY);
        assert_eq!(layout.page_top(1), None);
    }

    #[test]
    fn relayout_replaces_previous_pages() {
        let mut layout = layout_of(&[(100, 100), (100, 100), (100, 100)]);
        layout.set_pages([Size::new(50, 70)]);

        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.canvas_size(), Size::new(70, 90));
    }

    #[test]
    fn visible_pages_skip_pages_outside_band() {
        let layout = layout_of(&[(100, 100), (100, 100), (100, 100)]);
        // tops: 10, 120, 230
        let visible: Vec<_> = layout.visible_pages(105, 200).collect();
        assert_eq!(visible, vec![0, 1]);

        let visible: Vec<_> = layout.visible_pages(111, 200).collect();
        assert_eq!(visible, vec![1]);
    }

    fn page_sizes() -> impl Strategy<Value = Vec<(i32, i32)>> {
        prop::collection::vec((0..2000i32, 0..3000i32), 1..24)
    }

    proptest! {
        #[test]
        fn regions_stack_with_exact_gap(sizes in page_sizes()) {
            let layout = layout_of(&sizes);

            for index in 1..sizes.len() {
                let prev = layout.page_region(index - 1);
                let next = layout.page_region(index);
                prop_assert!(next.y > prev.y);
                prop_assert_eq!(next.y, prev.bottom() + layout.gap());
            }

            let last = layout.page_region(sizes.len() - 1);
            prop_assert_eq!(layout.canvas_size().height, last.bottom() + layout.gap());
        }

        #[test]
        fn page_at_y_clamps_to_ends(sizes in page_sizes(), offset in 0..10_000i32) {
            let layout = layout_of(&sizes);
            let last_top = layout.page_top(sizes.len() - 1).unwrap_or_default();
            let first_top = layout.page_top(0).unwrap_or_default();

            prop_assert_eq!(layout.page_at_y(last_top + offset), sizes.len() - 1);
            prop_assert_eq!(layout.page_at_y(first_top - 1 - offset), 0);
        }

        #[test]
        fn page_at_y_is_monotonic(sizes in page_sizes()) {
            let layout = layout_of(&sizes);
            let mut previous = 0;

            for y in (-20..layout.canvas_size().height + 20).step_by(7) {
                let page = layout.page_at_y(y);
                prop_assert!(page >= previous);
                previous = page;
            }
        }

        #[test]
        fn set_pages_is_idempotent(sizes in page_sizes()) {
            let mut layout = layout_of(&sizes);
            let first = layout.clone();
            layout.set_pages(sizes.iter().map(|&(w, h)| Size::new(w, h)));

            prop_assert_eq!(layout.entries(), first.entries());
            prop_assert_eq!(layout.canvas_size(), first.canvas_size());
        }
    }
}
