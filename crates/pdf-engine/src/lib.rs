use image::{ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use viewer_core::DocRect;

mod export;
pub mod outline;
mod raster;
mod renderer;
pub mod text;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use outline::OutlineEntry;
pub use renderer::DocumentView;
pub use text::{MediaBox, PageText};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Region of a page in points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
    pub clip: Option<ClipRect>,
    /// Document-space rectangles painted as translucent yellow.
    pub highlights: Vec<DocRect>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0, clip: None, highlights: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self { width_px: 256, height_px: 256 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("invalid page range {first}..={last} (page_count={page_count})")]
    InvalidRange { first: u32, last: u32, page_count: u32 },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Handle-based access to open documents. Page indices are zero-based and
/// geometry crossing this boundary is in points with a top-left origin.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target: ThumbnailSize,
    ) -> Result<RgbaImage, PdfEngineError>;
    /// Case-insensitive, non-overlapping matches of `needle` on one page.
    fn search_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        needle: &str,
    ) -> Result<Vec<DocRect>, PdfEngineError>;
    /// Text whose glyphs fall inside `clip`, lines separated by `\n`.
    fn page_text(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        clip: DocRect,
    ) -> Result<String, PdfEngineError>;
    fn outline(&self, handle: DocumentHandle) -> Result<Vec<OutlineEntry>, PdfEngineError>;
    /// Writes the zero-based inclusive `pages` to a new document at `output`.
    fn export_range(
        &self,
        handle: DocumentHandle,
        pages: RangeInclusive<u32>,
        output: &Path,
    ) -> Result<(), PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    document: Document,
    page_sizes: Vec<PageSize>,
    text: Vec<PageText>,
    outline: Vec<OutlineEntry>,
}

impl DocumentRecord {
    fn parse(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        let document = match Document::load_mem(bytes) {
            Ok(document) => document,
            Err(_) if trailer_declares_encryption(bytes) => {
                return Err(PdfEngineError::EncryptedUnsupported)
            }
            Err(err) => return Err(err.into()),
        };
        if document.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        let mut page_sizes = Vec::with_capacity(page_ids.len());
        let mut layers = Vec::with_capacity(page_ids.len());

        for (index, page_id) in page_ids.iter().enumerate() {
            let media = media_box(&document, *page_id);
            page_sizes.push(PageSize { width_pt: media.width(), height_pt: media.height() });

            let layer = text::extract_page_text(&document, *page_id, media).unwrap_or_else(|err| {
                log::warn!("page {}: no text layer ({err})", index + 1);
                PageText::default()
            });
            layers.push(layer);
        }

        let outline = outline::read_outline(&document, &page_ids);

        Ok(Self { document, page_sizes, text: layers, outline })
    }

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn check_page(&self, page_index: u32) -> Result<usize, PdfEngineError> {
        if page_index < self.page_count() {
            Ok(page_index as usize)
        } else {
            Err(PdfEngineError::PageOutOfRange { page: page_index, page_count: self.page_count() })
        }
    }
}

/// Whether the last `trailer` dictionary of an unparseable file names an
/// `/Encrypt` entry.
fn trailer_declares_encryption(bytes: &[u8]) -> bool {
    const TRAILER: &[u8] = b"trailer";
    const ENCRYPT: &[u8] = b"/Encrypt";

    let Some(start) = bytes.windows(TRAILER.len()).rposition(|window| window == TRAILER) else {
        return false;
    };
    bytes[start..].windows(ENCRYPT.len()).any(|window| window == ENCRYPT)
}

/// Page box looked up on the page, then up the `/Parent` chain; US Letter
/// when none is found.
fn media_box(doc: &Document, page_id: ObjectId) -> MediaBox {
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;

    while let Some(dict) = current {
        let found = dict.get(b"MediaBox").ok().and_then(|obj| outline::resolve(doc, obj));
        if let Some(Object::Array(values)) = found {
            if let [x0, y0, x1, y1] = values.as_slice() {
                let corners = [x0, y0, x1, y1].map(text::number);
                if let [Some(x0), Some(y0), Some(x1), Some(y1)] = corners {
                    return MediaBox { x0, y0, x1, y1 };
                }
            }
        }

        depth += 1;
        if depth > 32 {
            break;
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_dictionary(*parent).ok(),
            _ => None,
        };
    }

    log::warn!("page {page_id:?} has no usable MediaBox, assuming US Letter");
    MediaBox::LETTER
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = DocumentRecord::parse(&bytes)?;
        log::info!("opened document with {} pages", record.page_count());

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_count())
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        Ok(record.page_sizes[record.check_page(page_index)?])
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let record = self.record(handle)?;
        let index = record.check_page(request.page_index)?;

        Ok(raster::rasterize(record.page_sizes[index], &record.text[index], &request))
    }

    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target: ThumbnailSize,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page = self.render_page(
            handle,
            RenderRequest { page_index, scale: 0.25, ..RenderRequest::default() },
        )?;

        Ok(image::imageops::thumbnail(&page, target.width_px.max(1), target.height_px.max(1)))
    }

    fn search_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        needle: &str,
    ) -> Result<Vec<DocRect>, PdfEngineError> {
        let record = self.record(handle)?;
        Ok(record.text[record.check_page(page_index)?].search(needle))
    }

    fn page_text(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        clip: DocRect,
    ) -> Result<String, PdfEngineError> {
        let record = self.record(handle)?;
        Ok(record.text[record.check_page(page_index)?].text_in(clip))
    }

    fn outline(&self, handle: DocumentHandle) -> Result<Vec<OutlineEntry>, PdfEngineError> {
        Ok(self.record(handle)?.outline.clone())
    }

    fn export_range(
        &self,
        handle: DocumentHandle,
        pages: RangeInclusive<u32>,
        output: &Path,
    ) -> Result<(), PdfEngineError> {
        let record = self.record(handle)?;
        export::export_pages(&record.document, record.page_count(), pages, output)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}
