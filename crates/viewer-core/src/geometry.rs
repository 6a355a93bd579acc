//! Integer canvas geometry and floating point document-space rectangles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas pixels. `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect { x: 0, y: 0, width: 0, height: 0 };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two corner points, in either order.
    /// Spans wider than `i32::MAX` keep their right/bottom edge and lose
    /// the excess on the left/top.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (x, width) = span(a.x.min(b.x), a.x.max(b.x));
        let (y, height) = span(a.y.min(b.y), a.y.max(b.y));
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        let (x, width) = span(x, right);
        let (y, height) = span(y, bottom);
        let rect = Rect::new(x, y, width, height);
        (!rect.is_empty()).then_some(rect)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.width, self.height)
    }
}

/// Start and length of `lo..hi`, clamped so the length fits in an `i32`.
/// A reversed range yields a non-positive length.
fn span(lo: i32, hi: i32) -> (i32, i32) {
    let len = (i64::from(hi) - i64::from(lo)).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    let start = (i64::from(hi) - len).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    (start as i32, len as i32)
}

/// Page size in document units (points).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocSize {
    pub width: f32,
    pub height: f32,
}

impl DocSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in document space, top-left origin, `(x0, y0)` to `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl DocRect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &DocRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn scaled(&self, factor: f32) -> DocRect {
        DocRect::new(self.x0 * factor, self.y0 * factor, self.x1 * factor, self.y1 * factor)
    }

    /// Smallest integer rectangle covering this one.
    pub fn to_pixel_rect(&self) -> Rect {
        let x = self.x0.floor() as i32;
        let y = self.y0.floor() as i32;
        let right = self.x1.ceil() as i32;
        let bottom = self.y1.ceil() as i32;
        let (x, width) = span(x, right.max(x));
        let (y, height) = span(y, bottom.max(y));
        Rect::new(x, y, width, height)
    }
}
