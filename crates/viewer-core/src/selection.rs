//! Rubber-band selection and its mapping to document-space clip rectangles.

use crate::geometry::{DocRect, Point, Rect};
use crate::layout::PageLayout;

/// Drag gesture state. Both points are set only while a drag is live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionGesture {
    origin: Option<Point>,
    current: Option<Point>,
}

impl SelectionGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, point: Point) {
        self.origin = Some(point);
        self.current = Some(point);
    }

    pub fn drag_to(&mut self, point: Point) {
        if self.origin.is_some() {
            self.current = Some(point);
        }
    }

    pub fn release(&mut self, point: Point) {
        self.drag_to(point);
    }

    pub fn clear(&mut self) {
        self.origin = None;
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        self.origin.is_some()
    }

    pub fn rect(&self) -> Option<Rect> {
        Some(Rect::from_corners(self.origin?, self.current?))
    }
}

/// The part of a selection that falls on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageClip {
    pub page_index: usize,
    /// Intersection with the page region, canvas pixels.
    pub canvas: Rect,
    /// Same area in page-local pixels.
    pub local: Rect,
    /// Same area in document space.
    pub clip: DocRect,
}

/// Every page the selection touches, in page order.
pub fn map_selection(layout: &PageLayout, scale: f32, selection: Rect) -> Vec<PageClip> {
    if scale <= 0.0 {
        return Vec::new();
    }

    layout
        .regions()
        .filter_map(|(page_index, region)| {
            let canvas = selection.intersect(&region)?;
            let local = canvas.translated(-region.x, -region.y);
            let clip = DocRect::new(
                local.x as f32 / scale,
                local.y as f32 / scale,
                local.right() as f32 / scale,
                local.bottom() as f32 / scale,
            );
            Some(PageClip { page_index, canvas, local, clip })
        })
        .collect()
}

/// Text under the selection, taken from the first intersecting page that
/// yields any.
///
/// Pages after the first one with text are never consulted, so a selection
/// spanning two pages copies only the upper page's text.
pub fn first_page_text<F, E>(
    layout: &PageLayout,
    scale: f32,
    selection: Rect,
    min_size: i32,
    mut extract: F,
) -> Result<Option<(usize, String)>, E>
where
    F: FnMut(usize, DocRect) -> Result<String, E>,
{
    if selection.width < min_size || selection.height < min_size {
        return Ok(None);
    }

    for page in map_selection(layout, scale, selection) {
        let text = extract(page.page_index, page.clip)?;
        let text = text.trim();
        if !text.is_empty() {
            return Ok(Some((page.page_index, text.to_owned())));
        }
    }

    Ok(None)
}
