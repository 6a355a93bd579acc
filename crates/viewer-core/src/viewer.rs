//! Viewport and zoom controller.
//!
//! [`Viewer`] owns the page bitmaps, the layout and the viewport state. The
//! open document is not owned here: every operation that needs the
//! rendering collaborator borrows it for the duration of the call.
//!
//! Notifications are queued and handed out by [`Viewer::drain_events`].
//! A [`ViewerEvent::PageChanged`] is queued once per distinct active page,
//! never once per scroll step.

use std::collections::VecDeque;

use crate::config::ViewerConfig;
use crate::geometry::{Point, Rect, Size};
use crate::layout::PageLayout;
use crate::render::{PageImage, PageRenderer};
use crate::search::SearchHits;
use crate::selection::{first_page_text, SelectionGesture};

/// Zoom changes smaller than this are ignored.
pub const ZOOM_EPSILON: f32 = 0.001;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to render page {page}")]
    Render {
        page: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to search page {page}")]
    Search {
        page: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to extract text from page {page}")]
    Text {
        page: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to read size of page {page}")]
    PageSize {
        page: usize,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    PageChanged(usize),
    ZoomChanged(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scroll_offset: i32,
    pub viewport: Size,
    pub zoom: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self { scroll_offset: 0, viewport: Size::new(800, 600), zoom: 1.0 }
    }
}

#[derive(Debug)]
pub struct Viewer<P> {
    config: ViewerConfig,
    layout: PageLayout,
    pages: Vec<PageImage<P>>,
    state: ViewportState,
    active_page: Option<usize>,
    hits: SearchHits,
    selection: SelectionGesture,
    events: VecDeque<ViewerEvent>,
    has_document: bool,
}

impl<P> Viewer<P> {
    pub fn new(config: ViewerConfig) -> Self {
        let state = ViewportState { zoom: config.clamp_zoom(1.0), ..ViewportState::default() };

        Self {
            layout: PageLayout::new(config.page_gap),
            config,
            pages: Vec::new(),
            state,
            active_page: None,
            hits: SearchHits::new(),
            selection: SelectionGesture::new(),
            events: VecDeque::new(),
            has_document: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn pages(&self) -> &[PageImage<P>] {
        &self.pages
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn has_document(&self) -> bool {
        self.has_document
    }

    pub fn zoom(&self) -> f32 {
        self.state.zoom
    }

    pub fn scroll_offset(&self) -> i32 {
        self.state.scroll_offset
    }

    pub fn active_page(&self) -> usize {
        self.active_page.unwrap_or(0)
    }

    pub fn search_hits(&self) -> &SearchHits {
        &self.hits
    }

    pub fn render_scale(&self) -> f32 {
        self.config.render_scale(self.state.zoom)
    }

    pub fn scroll_max(&self) -> i32 {
        (self.layout.canvas_size().height - self.state.viewport.height).max(0)
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.state.viewport = Size::new(size.width.max(0), size.height.max(0));
        self.scroll_to(self.state.scroll_offset);
    }

    /// Renders every page of a freshly opened document and jumps to the
    /// first page. On failure the viewer keeps whatever it showed before.
    pub fn load<R>(&mut self, renderer: &R) -> Result<(), ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        let pages = render_pages(renderer, self.render_scale(), &SearchHits::new())?;

        self.hits.clear();
        self.selection.clear();
        self.active_page = None;
        self.has_document = true;
        self.install(pages);
        self.state.scroll_offset = 0;
        self.scroll_to_page(0);

        log::info!("viewer loaded {} pages at zoom {:.2}", self.pages.len(), self.state.zoom);
        Ok(())
    }

    pub fn close(&mut self) {
        self.pages.clear();
        self.layout.set_pages(std::iter::empty());
        self.hits.clear();
        self.selection.clear();
        self.active_page = None;
        self.has_document = false;
        self.state.scroll_offset = 0;
    }

    /// Re-renders at the clamped `zoom`, keeping the relative scroll
    /// position. Returns `false` when the zoom did not change.
    pub fn set_zoom<R>(&mut self, renderer: &R, zoom: f32) -> Result<bool, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        let zoom = self.config.clamp_zoom(zoom);
        if (zoom - self.state.zoom).abs() < ZOOM_EPSILON {
            return Ok(false);
        }

        let fraction = self.state.scroll_offset as f32 / self.scroll_max().max(1) as f32;

        if self.has_document {
            let pages = render_pages(renderer, self.config.render_scale(zoom), &self.hits)?;
            self.install(pages);
        }

        self.state.zoom = zoom;
        self.scroll_to((fraction * self.scroll_max() as f32) as i32);
        self.events.push_back(ViewerEvent::ZoomChanged(zoom));

        log::debug!("zoom set to {zoom:.3}, scroll fraction {fraction:.3}");
        Ok(true)
    }

    pub fn zoom_in<R>(&mut self, renderer: &R) -> Result<bool, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        self.set_zoom(renderer, self.state.zoom + self.config.zoom_step)
    }

    pub fn zoom_out<R>(&mut self, renderer: &R) -> Result<bool, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        self.set_zoom(renderer, self.state.zoom - self.config.zoom_step)
    }

    /// Zooms so the first page fills the viewport width minus the fit margin.
    pub fn fit_width<R>(&mut self, renderer: &R) -> Result<bool, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        let Some((page_width, _)) = self.first_page_pixels(renderer)? else {
            return Ok(false);
        };

        let usable = (self.state.viewport.width - self.config.fit_margin) as f32;
        self.set_zoom(renderer, usable / page_width)
    }

    pub fn fit_page<R>(&mut self, renderer: &R) -> Result<bool, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        let Some((page_width, page_height)) = self.first_page_pixels(renderer)? else {
            return Ok(false);
        };

        let usable_width = (self.state.viewport.width - self.config.fit_margin) as f32;
        let usable_height = (self.state.viewport.height - self.config.fit_margin) as f32;
        self.set_zoom(renderer, (usable_width / page_width).min(usable_height / page_height))
    }

    pub fn scroll_to(&mut self, offset: i32) {
        self.state.scroll_offset = offset.clamp(0, self.scroll_max());
        self.track_active_page();
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll_to(self.state.scroll_offset.saturating_add(delta));
    }

    /// Scrolls so `page_index` sits just below the top of the viewport.
    /// Out-of-range indices are ignored.
    pub fn scroll_to_page(&mut self, page_index: usize) -> bool {
        let Some(top) = self.layout.page_top(page_index) else {
            return false;
        };

        let offset = (top - self.config.scroll_to_page_margin).max(0);
        self.state.scroll_offset = offset.min(self.scroll_max());
        self.set_active_page(page_index);
        true
    }

    /// Runs a search over every page, highlights the hits and jumps to the
    /// first page that has one. Returns the number of matches.
    pub fn search<R>(&mut self, renderer: &R, needle: &str) -> Result<usize, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        if !self.has_document || needle.is_empty() {
            self.hits.clear();
            self.rerender(renderer)?;
            return Ok(0);
        }

        let mut hits = SearchHits::new();
        hits.begin(needle);
        for page in 0..renderer.page_count() {
            let rects = renderer
                .search_page(page, needle)
                .map_err(|source| ViewerError::Search { page, source: Box::new(source) })?;
            hits.insert(page, rects);
        }

        self.hits = hits;
        self.rerender(renderer)?;

        if let Some(first) = self.hits.first_page() {
            self.scroll_to_page(first);
        }

        log::debug!("search {needle:?}: {} matches", self.hits.total());
        Ok(self.hits.total())
    }

    pub fn clear_search<R>(&mut self, renderer: &R) -> Result<(), ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        self.hits.clear();
        self.rerender(renderer)
    }

    pub fn press(&mut self, point: Point) {
        self.selection.press(point);
    }

    pub fn drag_to(&mut self, point: Point) {
        self.selection.drag_to(point);
    }

    pub fn selection_rect(&self) -> Option<Rect> {
        self.selection.rect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Text under the current selection. See [`first_page_text`] for the
    /// multi-page behaviour.
    pub fn selected_text<R>(&self, renderer: &R) -> Result<Option<String>, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        let Some(selection) = self.selection.rect() else {
            return Ok(None);
        };

        if !self.has_document {
            return Ok(None);
        }

        let found = first_page_text(
            &self.layout,
            self.render_scale(),
            selection,
            self.config.min_selection_px,
            |page, clip| {
                renderer
                    .page_text(page, clip)
                    .map_err(|source| ViewerError::Text { page, source: Box::new(source) })
            },
        )?;

        Ok(found.map(|(_, text)| text))
    }

    /// Ends the drag at `point`, returns the selected text and drops the
    /// selection.
    pub fn release<R>(&mut self, renderer: &R, point: Point) -> Result<Option<String>, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        self.selection.release(point);
        let text = self.selected_text(renderer);
        self.selection.clear();
        text
    }

    /// Pages intersecting the viewport with their draw regions.
    pub fn paint_items(&self) -> impl Iterator<Item = (Rect, &PageImage<P>)> + '_ {
        let top = self.state.scroll_offset;
        let bottom = top + self.state.viewport.height;

        self.layout
            .visible_pages(top, bottom)
            .filter_map(move |index| Some((self.layout.page_region(index), self.pages.get(index)?)))
    }

    fn rerender<R>(&mut self, renderer: &R) -> Result<(), ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        if !self.has_document {
            return Ok(());
        }

        let pages = render_pages(renderer, self.render_scale(), &self.hits)?;
        self.install(pages);
        self.scroll_to(self.state.scroll_offset);
        Ok(())
    }

    fn install(&mut self, pages: Vec<PageImage<P>>) {
        self.layout.set_pages(pages.iter().map(PageImage::extent));
        self.pages = pages;
    }

    fn first_page_pixels<R>(&self, renderer: &R) -> Result<Option<(f32, f32)>, ViewerError>
    where
        R: PageRenderer<Pixels = P>,
    {
        if !self.has_document || renderer.page_count() == 0 {
            return Ok(None);
        }

        let size = renderer
            .page_size(0)
            .map_err(|source| ViewerError::PageSize { page: 0, source: Box::new(source) })?;

        let scale = self.config.base_scale();
        let (width, height) = (size.width * scale, size.height * scale);
        if width <= 0.0 || height <= 0.0 {
            return Ok(None);
        }

        Ok(Some((width, height)))
    }

    fn track_active_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }

        let center = self.state.scroll_offset + self.state.viewport.height / 2;
        let page = self.layout.page_at_y(center);
        self.set_active_page(page);
    }

    fn set_active_page(&mut self, page: usize) {
        if self.active_page == Some(page) {
            return;
        }

        self.active_page = Some(page);
        self.events.push_back(ViewerEvent::PageChanged(page));
    }
}

fn render_pages<R>(
    renderer: &R,
    scale: f32,
    hits: &SearchHits,
) -> Result<Vec<PageImage<R::Pixels>>, ViewerError>
where
    R: PageRenderer,
{
    (0..renderer.page_count())
        .map(|page| {
            renderer
                .render_page(page, scale, hits.for_page(page))
                .map_err(|source| ViewerError::Render { page, source: Box::new(source) })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DocRect, DocSize};
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error)]
    #[error("fake renderer failure")]
    struct FakeError;

    /// Pages render to a payload holding the number of highlights painted.
    struct FakeRenderer {
        sizes: Vec<DocSize>,
        texts: Vec<&'static str>,
        fail_render: Cell<bool>,
        renders: Cell<usize>,
    }

    impl FakeRenderer {
        fn new(pages: &[(f32, f32, &'static str)]) -> Self {
            Self {
                sizes: pages.iter().map(|&(w, h, _)| DocSize::new(w, h)).collect(),
                texts: pages.iter().map(|&(_, _, text)| text).collect(),
                fail_render: Cell::new(false),
                renders: Cell::new(0),
            }
        }

        fn three_pages() -> Self {
            Self::new(&[
                (600.0, 800.0, "alpha"),
                (600.0, 800.0, "beta gamma"),
                (600.0, 800.0, "gamma gamma"),
            ])
        }
    }

    impl PageRenderer for FakeRenderer {
        type Pixels = usize;
        type Error = FakeError;

        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn page_size(&self, page_index: usize) -> Result<DocSize, FakeError> {
            self.sizes.get(page_index).copied().ok_or(FakeError)
        }

        fn render_page(
            &self,
            page_index: usize,
            scale: f32,
            highlights: &[DocRect],
        ) -> Result<PageImage<usize>, FakeError> {
            if self.fail_render.get() {
                return Err(FakeError);
            }
            self.renders.set(self.renders.get() + 1);

            let size = self.page_size(page_index)?;
            Ok(PageImage::new(
                highlights.len(),
                (size.width * scale).round() as u32,
                (size.height * scale).round() as u32,
            ))
        }

        fn search_page(&self, page_index: usize, needle: &str) -> Result<Vec<DocRect>, FakeError> {
            let text = self.texts.get(page_index).ok_or(FakeError)?;
            Ok(text
                .match_indices(needle)
                .map(|(at, _)| DocRect::new(at as f32 * 5.0, 10.0, at as f32 * 5.0 + 20.0, 22.0))
                .collect())
        }

        fn page_text(&self, page_index: usize, _clip: DocRect) -> Result<String, FakeError> {
            self.texts.get(page_index).map(|text| (*text).to_owned()).ok_or(FakeError)
        }
    }

    /// One point per pixel at 100% zoom keeps the numbers readable.
    fn viewer() -> Viewer<usize> {
        let mut viewer = Viewer::new(ViewerConfig { dpi: 72.0, ..ViewerConfig::default() });
        viewer.set_viewport_size(Size::new(840, 400));
        viewer
    }

    fn loaded(renderer: &FakeRenderer) -> Viewer<usize> {
        let mut viewer = viewer();
        viewer.load(renderer).expect("load should succeed");
        viewer
    }

    #[test]
    fn load_lays_out_pages_and_announces_first_page() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);

        assert_eq!(viewer.layout().canvas_size(), Size::new(620, 2440));
        assert_eq!(viewer.layout().page_region(2), Rect::new(10, 1630, 600, 800));
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::PageChanged(0)]);
        assert_eq!(viewer.active_page(), 0);
    }

    #[test]
    fn page_change_is_reported_once_per_distinct_page() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.drain_events();

        viewer.scroll_to(100);
        viewer.scroll_to(500);
        viewer.scroll_to(700);
        viewer.scroll_to(710);
        viewer.scroll_by(5);
        viewer.scroll_to(0);

        assert_eq!(
            viewer.drain_events(),
            vec![ViewerEvent::PageChanged(1), ViewerEvent::PageChanged(0)]
        );
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);

        viewer.scroll_to(1_000_000);
        assert_eq!(viewer.scroll_offset(), 2040);
        assert_eq!(viewer.active_page(), 2);

        viewer.scroll_to(-50);
        assert_eq!(viewer.scroll_offset(), 0);
    }

    #[test]
    fn zoom_preserves_relative_scroll_position() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.scroll_to(1020);
        viewer.drain_events();

        assert!(viewer.set_zoom(&renderer, 2.0).expect("zoom should succeed"));

        assert_eq!(viewer.layout().canvas_size(), Size::new(1220, 4840));
        assert_eq!(viewer.scroll_offset(), 2220);
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::ZoomChanged(2.0)]);
    }

    #[test]
    fn zoom_round_trip_restores_canvas() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        let original = viewer.layout().canvas_size();

        viewer.set_zoom(&renderer, 1.7).expect("zoom should succeed");
        assert_ne!(viewer.layout().canvas_size(), original);

        viewer.set_zoom(&renderer, 1.0).expect("zoom should succeed");
        assert_eq!(viewer.layout().canvas_size(), original);
    }

    #[test]
    fn zoom_is_clamped_and_tiny_changes_are_ignored() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        let renders = renderer.renders.get();

        assert!(!viewer.set_zoom(&renderer, 1.0004).expect("zoom should succeed"));
        assert_eq!(renderer.renders.get(), renders);

        viewer.set_zoom(&renderer, 100.0).expect("zoom should succeed");
        assert_eq!(viewer.zoom(), 5.0);

        viewer.set_zoom(&renderer, 0.0).expect("zoom should succeed");
        assert_eq!(viewer.zoom(), 0.2);
    }

    #[test]
    fn zoom_steps_in_and_out() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);

        viewer.zoom_in(&renderer).expect("zoom should succeed");
        assert!((viewer.zoom() - 1.1).abs() < 1e-6);

        viewer.zoom_out(&renderer).expect("zoom should succeed");
        viewer.zoom_out(&renderer).expect("zoom should succeed");
        assert!((viewer.zoom() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn failed_render_keeps_previous_zoom_and_layout() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        let canvas = viewer.layout().canvas_size();

        renderer.fail_render.set(true);
        let err = viewer.set_zoom(&renderer, 2.0).expect_err("render should fail");

        assert!(matches!(err, ViewerError::Render { page: 0, .. }));
        assert_eq!(viewer.zoom(), 1.0);
        assert_eq!(viewer.layout().canvas_size(), canvas);
    }

    #[test]
    fn fit_width_and_fit_page_use_first_page() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);

        viewer.fit_width(&renderer).expect("fit should succeed");
        assert!((viewer.zoom() - 800.0 / 600.0).abs() < 1e-4);

        viewer.fit_page(&renderer).expect("fit should succeed");
        assert!((viewer.zoom() - 360.0 / 800.0).abs() < 1e-4);
    }

    #[test]
    fn fit_without_document_is_a_no_op() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = viewer();

        assert!(!viewer.fit_width(&renderer).expect("fit should succeed"));
        assert_eq!(viewer.zoom(), 1.0);
    }

    #[test]
    fn scroll_to_page_leaves_margin_above_page() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.drain_events();

        assert!(viewer.scroll_to_page(1));
        assert_eq!(viewer.scroll_offset(), 810);
        assert_eq!(viewer.active_page(), 1);

        assert!(!viewer.scroll_to_page(3));
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::PageChanged(1)]);
    }

    #[test]
    fn search_highlights_and_jumps_to_first_hit() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);

        let total = viewer.search(&renderer, "gamma").expect("search should succeed");

        assert_eq!(total, 3);
        assert_eq!(viewer.active_page(), 1);
        let painted: Vec<usize> = viewer.pages().iter().map(|page| *page.pixels()).collect();
        assert_eq!(painted, vec![0, 1, 2]);
        assert_eq!(viewer.search_hits().query(), Some("gamma"));
    }

    #[test]
    fn empty_search_and_clear_drop_highlights() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.search(&renderer, "gamma").expect("search should succeed");

        assert_eq!(viewer.search(&renderer, "").expect("search should succeed"), 0);
        assert!(viewer.search_hits().is_empty());

        viewer.search(&renderer, "alpha").expect("search should succeed");
        viewer.clear_search(&renderer).expect("clear should succeed");
        assert!(viewer.pages().iter().all(|page| *page.pixels() == 0));
    }

    #[test]
    fn highlights_survive_zoom() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.search(&renderer, "alpha").expect("search should succeed");

        viewer.set_zoom(&renderer, 1.5).expect("zoom should succeed");
        assert_eq!(*viewer.pages()[0].pixels(), 1);
    }

    #[test]
    fn release_copies_text_and_clears_selection() {
        let renderer = FakeRenderer::new(&[(600.0, 800.0, "  "), (600.0, 800.0, "second page")]);
        let mut viewer = loaded(&renderer);

        viewer.press(Point::new(50, 700));
        viewer.drag_to(Point::new(300, 900));
        assert_eq!(viewer.selection_rect(), Some(Rect::new(50, 700, 250, 200)));

        let text = viewer.release(&renderer, Point::new(300, 900)).expect("copy should succeed");

        assert_eq!(text.as_deref(), Some("second page"));
        assert_eq!(viewer.selection_rect(), None);
    }

    #[test]
    fn close_returns_to_placeholder() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.close();

        assert!(!viewer.has_document());
        assert_eq!(viewer.layout().canvas_size(), crate::layout::PLACEHOLDER_CANVAS);
        assert_eq!(viewer.layout().page_region(0), Rect::EMPTY);
    }

    #[test]
    fn paint_items_cover_only_the_viewport() {
        let renderer = FakeRenderer::three_pages();
        let mut viewer = loaded(&renderer);
        viewer.scroll_to(700);

        let regions: Vec<Rect> = viewer.paint_items().map(|(rect, _)| rect).collect();
        assert_eq!(regions, vec![Rect::new(10, 10, 600, 800), Rect::new(10, 820, 600, 800)]);
    }
}
