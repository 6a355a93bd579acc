//! Boundary to the rendering collaborator.

use crate::geometry::{DocRect, DocSize, Size};

/// A rendered page bitmap. The pixel payload is opaque to the viewer; only
/// its dimensions take part in layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage<P> {
    pixels: P,
    width: u32,
    height: u32,
}

impl<P> PageImage<P> {
    pub fn new(pixels: P, width: u32, height: u32) -> Self {
        Self { pixels, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> Size {
        let clamp = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);
        Size::new(clamp(self.width), clamp(self.height))
    }

    pub fn pixels(&self) -> &P {
        &self.pixels
    }

    pub fn into_pixels(self) -> P {
        self.pixels
    }
}

/// Synchronous access to an open document: rasterization, search and text
/// extraction. Coordinates crossing this boundary are in document space.
pub trait PageRenderer {
    type Pixels;
    type Error: std::error::Error + Send + Sync + 'static;

    fn page_count(&self) -> usize;

    fn page_size(&self, page_index: usize) -> Result<DocSize, Self::Error>;

    /// Rasterizes a page at `scale` pixels per point, painting `highlights`
    /// over the page content.
    fn render_page(
        &self,
        page_index: usize,
        scale: f32,
        highlights: &[DocRect],
    ) -> Result<PageImage<Self::Pixels>, Self::Error>;

    fn search_page(&self, page_index: usize, needle: &str) -> Result<Vec<DocRect>, Self::Error>;

    fn page_text(&self, page_index: usize, clip: DocRect) -> Result<String, Self::Error>;
}
