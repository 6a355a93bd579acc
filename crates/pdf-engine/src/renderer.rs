use viewer_core::{DocRect, DocSize, PageImage, PageRenderer};

use crate::{DocumentHandle, PdfEngine, PdfEngineError, RenderRequest, RgbaImage};

/// One open document seen through a [`PdfEngine`], as the viewer consumes it.
#[derive(Debug)]
pub struct DocumentView<'a, E: ?Sized> {
    engine: &'a E,
    handle: DocumentHandle,
    page_count: usize,
}

impl<'a, E: PdfEngine + ?Sized> DocumentView<'a, E> {
    pub fn new(engine: &'a E, handle: DocumentHandle) -> Result<Self, PdfEngineError> {
        let page_count = engine.page_count(handle)? as usize;
        Ok(Self { engine, handle, page_count })
    }

    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }
}

fn page_number(page_index: usize) -> u32 {
    u32::try_from(page_index).unwrap_or(u32::MAX)
}

impl<E: PdfEngine + ?Sized> PageRenderer for DocumentView<'_, E> {
    type Pixels = RgbaImage;
    type Error = PdfEngineError;

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page_index: usize) -> Result<DocSize, PdfEngineError> {
        let size = self.engine.page_size(self.handle, page_number(page_index))?;
        Ok(DocSize::new(size.width_pt, size.height_pt))
    }

    fn render_page(
        &self,
        page_index: usize,
        scale: f32,
        highlights: &[DocRect],
    ) -> Result<PageImage<RgbaImage>, PdfEngineError> {
        let request = RenderRequest {
            page_index: page_number(page_index),
            scale,
            clip: None,
            highlights: highlights.to_vec(),
        };
        let image = self.engine.render_page(self.handle, request)?;
        let (width, height) = image.dimensions();
        Ok(PageImage::new(image, width, height))
    }

    fn search_page(&self, page_index: usize, needle: &str) -> Result<Vec<DocRect>, PdfEngineError> {
        self.engine.search_page(self.handle, page_number(page_index), needle)
    }

    fn page_text(&self, page_index: usize, clip: DocRect) -> Result<String, PdfEngineError> {
        self.engine.page_text(self.handle, page_number(page_index), clip)
    }
}
