//! Top-level controller: owns the engine, the open document handle, the
//! session model and the viewer, and keeps them in step.

use anyhow::{Context, Result};
use doc_model::{
    apply_session_action, parse_zoom_text, ExportRequest, SessionAction, SessionState, TocEntry,
    ZOOM_PRESETS,
};
use pdf_engine::{
    default_engine, DocumentHandle, DocumentView, LopdfEngine, OpenSource, PdfEngine, RgbaImage,
};
use std::path::{Path, PathBuf};
use viewer_core::{Point, Size, Viewer, ViewerConfig, ViewerError, ViewerEvent};

pub struct CutterApp<E = LopdfEngine> {
    engine: E,
    handle: Option<DocumentHandle>,
    session: SessionState,
    viewer: Viewer<RgbaImage>,
}

impl CutterApp<LopdfEngine> {
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_engine(default_engine(), config)
    }
}

impl<E: PdfEngine> CutterApp<E> {
    pub fn with_engine(engine: E, config: ViewerConfig) -> Self {
        Self { engine, handle: None, session: SessionState::default(), viewer: Viewer::new(config) }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn handle(&self) -> Option<DocumentHandle> {
        self.handle
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn viewer(&self) -> &Viewer<RgbaImage> {
        &self.viewer
    }

    pub fn status(&self) -> &str {
        &self.session.status
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewer.set_viewport_size(size);
        self.sync();
    }

    /// Opens `path` and replaces the current document. On failure nothing
    /// changes: the previous document, if any, stays open.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        ensure_pdf_exists(path)?;

        let handle = self.engine.open(OpenSource::from(path)).context("failed to open PDF")?;

        if let Err(err) = self.load_into_viewer(handle) {
            if let Err(close_err) = self.engine.close(handle) {
                log::warn!("failed to close document after load error: {close_err}");
            }
            return Err(err);
        }

        let toc = match self.engine.outline(handle) {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| TocEntry { level: entry.level, title: entry.title, page: entry.page })
                .collect(),
            Err(err) => {
                log::warn!("outline unavailable: {err}");
                Vec::new()
            }
        };

        if let Some(previous) = self.handle.replace(handle) {
            if let Err(err) = self.engine.close(previous) {
                log::warn!("failed to close previous document: {err}");
            }
        }

        let page_count = self.engine.page_count(handle)?;
        apply_session_action(
            &mut self.session,
            SessionAction::DocumentLoaded { path: path.to_path_buf(), page_count, toc },
        );
        self.sync();

        log::info!("{}", self.session.status);
        Ok(())
    }

    fn load_into_viewer(&mut self, handle: DocumentHandle) -> Result<()> {
        let view = DocumentView::new(&self.engine, handle)?;
        self.viewer.load(&view).context("failed to render document")?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.viewer.close();
        apply_session_action(&mut self.session, SessionAction::DocumentClosed);
        self.engine.close(handle)?;
        Ok(())
    }

    /// Runs `op` against the viewer and the open document, then forwards the
    /// viewer's notifications to the session. `None` without a document.
    fn with_view<T, F>(&mut self, op: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Viewer<RgbaImage>, &DocumentView<'_, E>) -> Result<T, ViewerError>,
    {
        let Some(handle) = self.handle else {
            return Ok(None);
        };

        let view = DocumentView::new(&self.engine, handle)?;
        let value = op(&mut self.viewer, &view)?;
        self.sync();
        Ok(Some(value))
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<bool> {
        Ok(self.with_view(|viewer, view| viewer.set_zoom(view, zoom))?.unwrap_or(false))
    }

    pub fn zoom_in(&mut self) -> Result<bool> {
        Ok(self.with_view(|viewer, view| viewer.zoom_in(view))?.unwrap_or(false))
    }

    pub fn zoom_out(&mut self) -> Result<bool> {
        Ok(self.with_view(|viewer, view| viewer.zoom_out(view))?.unwrap_or(false))
    }

    pub fn fit_width(&mut self) -> Result<bool> {
        Ok(self.with_view(|viewer, view| viewer.fit_width(view))?.unwrap_or(false))
    }

    pub fn fit_page(&mut self) -> Result<bool> {
        Ok(self.with_view(|viewer, view| viewer.fit_page(view))?.unwrap_or(false))
    }

    /// Applies one of [`ZOOM_PRESETS`]; unknown indices are ignored.
    pub fn zoom_preset(&mut self, index: usize) -> Result<bool> {
        match ZOOM_PRESETS.get(index) {
            Some(percent) => self.set_zoom(f32::from(*percent) / 100.0),
            None => Ok(false),
        }
    }

    /// Applies typed zoom text such as `125%`. Unparseable text is ignored.
    pub fn zoom_text(&mut self, text: &str) -> Result<bool> {
        match parse_zoom_text(text) {
            Some(zoom) => self.set_zoom(zoom),
            None => Ok(false),
        }
    }

    pub fn scroll_to(&mut self, offset: i32) {
        self.viewer.scroll_to(offset);
        self.sync();
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.viewer.scroll_by(delta);
        self.sync();
    }

    pub fn go_to_page(&mut self, page_index: u32) -> bool {
        let moved = self.viewer.scroll_to_page(page_index as usize);
        self.sync();
        moved
    }

    pub fn go_to_bookmark(&mut self, index: usize) -> bool {
        let page = self
            .session
            .document
            .as_ref()
            .and_then(|document| document.bookmarks.get(index))
            .map(|bookmark| bookmark.page);

        page.is_some_and(|page| self.go_to_page(page))
    }

    pub fn add_bookmark(&mut self, name: Option<String>) {
        apply_session_action(&mut self.session, SessionAction::AddBookmark { name });
    }

    pub fn remove_bookmark(&mut self, index: usize) {
        apply_session_action(&mut self.session, SessionAction::RemoveBookmark { index });
    }

    /// Searches every page for the trimmed `text`. Blank text is ignored.
    pub fn search(&mut self, text: &str) -> Result<usize> {
        let query = text.trim();
        if query.is_empty() || self.handle.is_none() {
            return Ok(0);
        }

        let matches = self.with_view(|viewer, view| viewer.search(view, query))?.unwrap_or(0);
        apply_session_action(
            &mut self.session,
            SessionAction::SearchFinished { query: query.to_owned(), matches },
        );
        Ok(matches)
    }

    pub fn clear_search(&mut self) -> Result<()> {
        self.with_view(|viewer, view| viewer.clear_search(view))?;
        apply_session_action(&mut self.session, SessionAction::SearchCleared);
        Ok(())
    }

    pub fn press(&mut self, point: Point) {
        self.viewer.press(point);
    }

    pub fn drag_to(&mut self, point: Point) {
        self.viewer.drag_to(point);
    }

    /// Ends a selection drag and returns the text to copy, if any.
    pub fn release(&mut self, point: Point) -> Result<Option<String>> {
        if self.handle.is_none() {
            self.viewer.clear_selection();
            return Ok(None);
        }

        Ok(self.with_view(|viewer, view| viewer.release(view, point))?.flatten())
    }

    /// Validates the range, then writes it. Defaults follow the export
    /// dialog: current page to last page, next to the source file.
    pub fn export(
        &mut self,
        from: Option<u32>,
        to: Option<u32>,
        output: Option<PathBuf>,
    ) -> Result<ExportRequest> {
        let request = ExportRequest::resolve(&self.session, from, to, output)?;
        let handle = self.handle.context("no document is open")?;

        if let Some(parent) = request.output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        self.engine
            .export_range(handle, request.page_indices(), &request.output)
            .with_context(|| format!("failed to export to {}", request.output.display()))?;

        apply_session_action(
            &mut self.session,
            SessionAction::Exported { output: request.output.clone() },
        );
        Ok(request)
    }

    fn sync(&mut self) {
        for event in self.viewer.drain_events() {
            let action = match event {
                ViewerEvent::PageChanged(page) => {
                    SessionAction::PageChanged { page: u32::try_from(page).unwrap_or(u32::MAX) }
                }
                ViewerEvent::ZoomChanged(zoom) => SessionAction::ZoomChanged { zoom },
            };
            apply_session_action(&mut self.session, action);
        }
    }
}

pub fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
