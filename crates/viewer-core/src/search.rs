//! Search hits per page, kept in document space so they survive zoom.

use std::collections::BTreeMap;

use crate::geometry::{DocRect, Rect};
use crate::layout::PageLayout;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    query: Option<String>,
    by_page: BTreeMap<usize, Vec<DocRect>>,
}

impl SearchHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.by_page.clear();
    }

    pub fn begin(&mut self, query: &str) {
        self.by_page.clear();
        self.query = Some(query.to_owned());
    }

    /// Records the matches of one page. Pages without matches are not stored.
    pub fn insert(&mut self, page_index: usize, rects: Vec<DocRect>) {
        if rects.is_empty() {
            self.by_page.remove(&page_index);
        } else {
            self.by_page.insert(page_index, rects);
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn for_page(&self, page_index: usize) -> &[DocRect] {
        self.by_page.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.by_page.values().map(Vec::len).sum()
    }

    pub fn first_page(&self) -> Option<usize> {
        self.by_page.keys().next().copied()
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_page.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }

    /// Highlight rectangles in canvas pixels, for hosts that draw overlays
    /// instead of baking highlights into the page bitmaps.
    pub fn canvas_rects(&self, layout: &PageLayout, scale: f32) -> Vec<(usize, Rect)> {
        self.by_page
            .iter()
            .filter(|(page_index, _)| **page_index < layout.page_count())
            .flat_map(|(&page_index, rects)| {
                let region = layout.page_region(page_index);
                rects.iter().map(move |rect| {
                    (page_index, rect.scaled(scale).to_pixel_rect().translated(region.x, region.y))
                })
            })
            .collect()
    }
}
