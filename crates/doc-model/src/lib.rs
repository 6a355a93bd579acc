use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Zoom levels offered as presets, in percent.
pub const ZOOM_PRESETS: [u16; 7] = [50, 75, 100, 125, 150, 200, 300];

/// One flat table-of-contents row as read from the document: `level`
/// starts at 1, `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    pub page: Option<u32>,
    pub children: Vec<OutlineNode>,
}

/// Nests flat TOC rows: a row at level `l` closes open rows until fewer
/// than `l` remain, then becomes a child of the innermost open row.
pub fn build_outline_tree<I>(entries: I) -> Vec<OutlineNode>
where
    I: IntoIterator<Item = TocEntry>,
{
    let mut roots = Vec::new();
    let mut open: Vec<OutlineNode> = Vec::new();

    for entry in entries {
        while open.len() >= entry.level.max(1) {
            close_innermost(&mut open, &mut roots);
        }
        open.push(OutlineNode { title: entry.title, page: entry.page, children: Vec::new() });
    }

    while !open.is_empty() {
        close_innermost(&mut open, &mut roots);
    }

    roots
}

fn close_innermost(open: &mut Vec<OutlineNode>, roots: &mut Vec<OutlineNode>) {
    let Some(node) = open.pop() else {
        return;
    };

    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    /// Zero-based.
    pub page: u32,
}

impl Bookmark {
    pub fn label(&self) -> String {
        format!("{}  (p.{})", self.name, self.page + 1)
    }
}

pub fn default_bookmark_name(page: u32) -> String {
    format!("Page {}", page + 1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSession {
    pub path: PathBuf,
    pub title: String,
    pub page_count: u32,
    pub outline: Vec<OutlineNode>,
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub document: Option<DocumentSession>,
    /// Zero-based.
    pub current_page: u32,
    pub zoom: f32,
    pub status: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { document: None, current_page: 0, zoom: 1.0, status: "No file loaded".to_owned() }
    }
}

impl SessionState {
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |document| document.page_count)
    }

    pub fn page_label(&self) -> Option<String> {
        self.document.as_ref().map(|document| page_status(self.current_page, document.page_count))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    DocumentLoaded { path: PathBuf, page_count: u32, toc: Vec<TocEntry> },
    DocumentClosed,
    PageChanged { page: u32 },
    ZoomChanged { zoom: f32 },
    /// `None` or a blank name falls back to the default `Page N` name.
    AddBookmark { name: Option<String> },
    RemoveBookmark { index: usize },
    SearchFinished { query: String, matches: usize },
    SearchCleared,
    Exported { output: PathBuf },
}

pub fn apply_session_action(state: &mut SessionState, action: SessionAction) {
    match action {
        SessionAction::DocumentLoaded { path, page_count, toc } => {
            let title = file_name(&path);
            state.status = loaded_status(&title, page_count);
            state.document = Some(DocumentSession {
                path,
                title,
                page_count,
                outline: build_outline_tree(toc),
                bookmarks: Vec::new(),
            });
            state.current_page = 0;
        }
        SessionAction::DocumentClosed => {
            state.document = None;
            state.current_page = 0;
            state.status = "No file loaded".to_owned();
        }
        SessionAction::PageChanged { page } => {
            let last = state.page_count().saturating_sub(1);
            state.current_page = page.min(last);
        }
        SessionAction::ZoomChanged { zoom } => state.zoom = zoom,
        SessionAction::AddBookmark { name } => {
            let page = state.current_page;
            let Some(document) = state.document.as_mut() else {
                return;
            };

            let name = name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default_bookmark_name(page));
            document.bookmarks.push(Bookmark { name, page });
        }
        SessionAction::RemoveBookmark { index } => {
            if let Some(document) = state.document.as_mut() {
                if index < document.bookmarks.len() {
                    document.bookmarks.remove(index);
                }
            }
        }
        SessionAction::SearchFinished { query, matches } => {
            state.status = search_status(&query, matches);
        }
        SessionAction::SearchCleared => state.status.clear(),
        SessionAction::Exported { output } => {
            state.status = format!("Exported -> {}", file_name(&output));
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("no document is open")]
    NoDocument,
    #[error("'From' must be <= 'To' (got {from} > {to})")]
    InvalidRange { from: u32, to: u32 },
    #[error("page {page} is outside 1..={page_count}")]
    PageOutOfBounds { page: u32, page_count: u32 },
}

/// A validated, 1-based inclusive page range and its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub from: u32,
    pub to: u32,
    pub output: PathBuf,
}

impl ExportRequest {
    /// Fills unset fields the way the export dialog pre-fills them: from the
    /// current page to the last page, written next to the source document.
    pub fn resolve(
        state: &SessionState,
        from: Option<u32>,
        to: Option<u32>,
        output: Option<PathBuf>,
    ) -> Result<Self, ExportError> {
        let document = state.document.as_ref().ok_or(ExportError::NoDocument)?;
        let page_count = document.page_count;
        if page_count == 0 {
            return Err(ExportError::NoDocument);
        }

        let from = from.unwrap_or((state.current_page + 1).min(page_count));
        let to = to.unwrap_or(page_count);

        for page in [from, to] {
            if page == 0 || page > page_count {
                return Err(ExportError::PageOutOfBounds { page, page_count });
            }
        }
        if from > to {
            return Err(ExportError::InvalidRange { from, to });
        }

        let output = output.unwrap_or_else(|| default_export_path(&document.path, from, to));
        Ok(Self { from, to, output })
    }

    /// Zero-based inclusive page indices.
    pub fn page_indices(&self) -> RangeInclusive<u32> {
        (self.from - 1)..=(self.to - 1)
    }

    pub fn page_total(&self) -> u32 {
        self.to - self.from + 1
    }
}

/// `<dir>/<stem>_pages_<from>-<to>.pdf` next to `source`.
pub fn default_export_path(source: &Path, from: u32, to: u32) -> PathBuf {
    let stem = source.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}_pages_{from}-{to}.pdf"))
}

/// Parses typed zoom text such as `125%` or `125` into a factor (`1.25`).
pub fn parse_zoom_text(text: &str) -> Option<f32> {
    let number = text.trim().trim_end_matches('%').trim();
    let percent: f32 = number.parse().ok()?;
    (percent.is_finite() && percent > 0.0).then_some(percent / 100.0)
}

/// Whole percent shown for `zoom`, truncated (`1.256` shows as `125%`).
pub fn zoom_label(zoom: f32) -> String {
    format!("{}%", (zoom * 100.0 + 1e-3) as i32)
}

pub fn zoom_status(zoom: f32) -> String {
    format!("Zoom: {}", zoom_label(zoom))
}

pub fn page_status(page: u32, page_count: u32) -> String {
    format!("Page {} / {page_count}", page + 1)
}

pub fn loaded_status(name: &str, page_count: u32) -> String {
    format!("Loaded: {name}  ({page_count} pages)")
}

pub fn search_status(query: &str, matches: usize) -> String {
    let noun = if matches == 1 { "match" } else { "matches" };
    format!("Found {matches} {noun} for \"{query}\"")
}
