//! Placeholder rasterizer for the lopdf backend.
//!
//! lopdf has no renderer, so a page is drawn as a white sheet with a light
//! border and a grey box per glyph of the text layer. Search highlights are
//! blended over the result.

use image::Rgba;
use viewer_core::{DocRect, Rect};

use crate::text::PageText;
use crate::{PageSize, RenderRequest, RgbaImage};

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);
const GLYPH: Rgba<u8> = Rgba([96, 96, 96, 255]);
const GLYPH_ALPHA: f32 = 0.35;
const HIGHLIGHT: Rgba<u8> = Rgba([255, 255, 0, 255]);
const HIGHLIGHT_ALPHA: f32 = 0.4;

/// Pixel extent of a page at `scale`; never smaller than 1x1.
pub(crate) fn page_extent(size: PageSize, scale: f32) -> (u32, u32) {
    (pixels(size.width_pt * scale), pixels(size.height_pt * scale))
}

fn pixels(length: f32) -> u32 {
    length.round().max(1.0) as u32
}

pub(crate) fn rasterize(size: PageSize, text: &PageText, request: &RenderRequest) -> RgbaImage {
    let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
    let (page_width, page_height) = page_extent(size, scale);

    let (origin_x, origin_y, width, height) = match request.clip {
        Some(clip) => (
            (clip.x * scale).round() as i32,
            (clip.y * scale).round() as i32,
            pixels(clip.width * scale),
            pixels(clip.height * scale),
        ),
        None => (0, 0, page_width, page_height),
    };

    let mut canvas = Canvas {
        image: RgbaImage::from_pixel(width, height, PAPER),
        origin_x,
        origin_y,
    };

    if page_width >= 4 && page_height >= 4 {
        let (w, h) = (page_width as i32, page_height as i32);
        canvas.fill(Rect::new(0, 0, w, 1), BORDER, 1.0);
        canvas.fill(Rect::new(0, h - 1, w, 1), BORDER, 1.0);
        canvas.fill(Rect::new(0, 0, 1, h), BORDER, 1.0);
        canvas.fill(Rect::new(w - 1, 0, 1, h), BORDER, 1.0);
    }

    for glyph in text.lines.iter().flat_map(|line| &line.chars) {
        if !glyph.ch.is_whitespace() {
            canvas.fill(device_rect(glyph.bbox, scale), GLYPH, GLYPH_ALPHA);
        }
    }

    for highlight in &request.highlights {
        canvas.fill(device_rect(*highlight, scale), HIGHLIGHT, HIGHLIGHT_ALPHA);
    }

    canvas.image
}

fn device_rect(rect: DocRect, scale: f32) -> Rect {
    rect.scaled(scale).to_pixel_rect()
}

/// Target image positioned at `origin` within the full page raster.
struct Canvas {
    image: RgbaImage,
    origin_x: i32,
    origin_y: i32,
}

impl Canvas {
    fn fill(&mut self, page_rect: Rect, color: Rgba<u8>, alpha: f32) {
        let bounds = Rect::new(0, 0, self.image.width() as i32, self.image.height() as i32);
        let Some(area) = page_rect.translated(-self.origin_x, -self.origin_y).intersect(&bounds)
        else {
            return;
        };

        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let pixel = self.image.get_pixel_mut(x as u32, y as u32);
                *pixel = blend(*pixel, color, alpha);
            }
        }
    }
}

fn blend(under: Rgba<u8>, over: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let mix = |a: u8, b: u8| (f32::from(a) * (1.0 - alpha) + f32::from(b) * alpha).round() as u8;
    Rgba([mix(under[0], over[0]), mix(under[1], over[1]), mix(under[2], over[2]), 255])
}
