//! Approximate text layer built from a page content stream.
//!
//! Glyph positions follow the text and graphics state operators exactly;
//! glyph widths do not consult font metrics and use a fixed average advance
//! instead. Byte strings are decoded as single-byte (Latin-1) text, which
//! covers the simple fonts most generated documents use.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use viewer_core::DocRect;

use crate::PdfEngineError;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.5;
const GLYPH_ASCENT: f32 = 0.8;
const GLYPH_DESCENT: f32 = 0.2;
/// `TJ` adjustments moving right by more than this many thousandths of an em
/// read as a word break.
const TJ_SPACE_THRESHOLD: f32 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextChar {
    pub ch: char,
    pub bbox: DocRect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub chars: Vec<TextChar>,
    baseline: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub lines: Vec<TextLine>,
}

/// Page box in PDF user space, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl MediaBox {
    pub const LETTER: MediaBox = MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 };

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }
}

impl PageText {
    /// Case-insensitive matches of `needle`, one rectangle per match.
    pub fn search(&self, needle: &str) -> Vec<DocRect> {
        let needle: Vec<char> = needle.chars().map(fold).collect();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut found = Vec::new();
        for line in &self.lines {
            let haystack: Vec<char> = line.chars.iter().map(|c| fold(c.ch)).collect();
            let mut start = 0;

            while start + needle.len() <= haystack.len() {
                if haystack[start..start + needle.len()] == needle[..] {
                    found.push(union(&line.chars[start..start + needle.len()]));
                    start += needle.len();
                } else {
                    start += 1;
                }
            }
        }

        found
    }

    /// Characters whose center lies inside `clip`, one output line per text
    /// line.
    pub fn text_in(&self, clip: DocRect) -> String {
        self.lines
            .iter()
            .filter_map(|line| {
                let text: String = line
                    .chars
                    .iter()
                    .filter(|c| {
                        let cx = (c.bbox.x0 + c.bbox.x1) / 2.0;
                        let cy = (c.bbox.y0 + c.bbox.y1) / 2.0;
                        clip.contains(cx, cy)
                    })
                    .map(|c| c.ch)
                    .collect();
                let text = text.trim_end().to_owned();
                (!text.trim().is_empty()).then_some(text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn plain_text(&self) -> String {
        self.lines.iter().map(TextLine::text).collect::<Vec<_>>().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn fold(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

fn union(chars: &[TextChar]) -> DocRect {
    chars.iter().skip(1).fold(chars[0].bbox, |acc, c| {
        DocRect::new(
            acc.x0.min(c.bbox.x0),
            acc.y0.min(c.bbox.y0),
            acc.x1.max(c.bbox.x1),
            acc.y1.max(c.bbox.y1),
        )
    })
}

pub fn extract_page_text(
    doc: &Document,
    page_id: ObjectId,
    media: MediaBox,
) -> Result<PageText, PdfEngineError> {
    let bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&bytes)?;

    let mut interpreter = TextInterpreter::new(media);
    for operation in &content.operations {
        interpreter.apply(operation);
    }

    Ok(interpreter.finish())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix { e: tx, f: ty, ..Matrix::IDENTITY }
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let [a, b, c, d, e, f] = operands else {
            return None;
        };

        Some(Matrix {
            a: number(a)?,
            b: number(b)?,
            c: number(c)?,
            d: number(d)?,
            e: number(e)?,
            f: number(f)?,
        })
    }

    /// `self` applied first, then `other`.
    fn then(self, other: Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.a + y * self.c + self.e, x * self.b + y * self.d + self.f)
    }
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

struct TextInterpreter {
    media: MediaBox,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    rise: f32,
    pending_space: bool,
    lines: Vec<TextLine>,
}

impl TextInterpreter {
    fn new(media: MediaBox) -> Self {
        Self {
            media,
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            rise: 0.0,
            pending_space: false,
            lines: Vec::new(),
        }
    }

    fn finish(self) -> PageText {
        PageText { lines: self.lines.into_iter().filter(|line| !line.chars.is_empty()).collect() }
    }

    fn apply(&mut self, operation: &Operation) {
        let operands = operation.operands.as_slice();

        match operation.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.ctm_stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.ctm = matrix.then(self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => self.set_from(operands, |state, value| state.leading = value),
            "Tc" => self.set_from(operands, |state, value| state.char_spacing = value),
            "Tw" => self.set_from(operands, |state, value| state.word_spacing = value),
            "Tz" => self.set_from(operands, |state, value| state.horizontal_scale = value / 100.0),
            "Ts" => self.set_from(operands, |state, value| state.rise = value),
            "Td" => {
                if let [tx, ty] = operands {
                    if let (Some(tx), Some(ty)) = (number(tx), number(ty)) {
                        self.move_line(tx, ty);
                    }
                }
            }
            "TD" => {
                if let [tx, ty] = operands {
                    if let (Some(tx), Some(ty)) = (number(tx), number(ty)) {
                        self.leading = -ty;
                        self.move_line(tx, ty);
                    }
                }
            }
            "Tm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.tm = matrix;
                    self.tlm = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    self.show(bytes);
                }
            }
            "\"" => {
                if let [aw, ac, text] = operands {
                    if let (Some(aw), Some(ac)) = (number(aw), number(ac)) {
                        self.word_spacing = aw;
                        self.char_spacing = ac;
                    }
                    self.next_line();
                    if let Some(bytes) = string_bytes(text) {
                        self.show(bytes);
                    }
                }
            }
            "TJ" => {
                let Some(Object::Array(items)) = operands.first() else {
                    return;
                };

                for item in items {
                    if let Some(bytes) = string_bytes(item) {
                        self.show(bytes);
                    } else if let Some(adjust) = number(item) {
                        let tx = -adjust / 1000.0 * self.font_size * self.horizontal_scale;
                        self.tm = Matrix::translate(tx, 0.0).then(self.tm);
                        if -adjust > TJ_SPACE_THRESHOLD {
                            self.pending_space = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn set_from(&mut self, operands: &[Object], set: impl FnOnce(&mut Self, f32)) {
        if let Some(value) = operands.first().and_then(number) {
            set(self, value);
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(self.tlm);
        self.tm = self.tlm;
        self.pending_space = false;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let ch = byte as char;
            let render = Matrix {
                a: self.font_size * self.horizontal_scale,
                b: 0.0,
                c: 0.0,
                d: self.font_size,
                e: 0.0,
                f: self.rise,
            }
            .then(self.tm)
            .then(self.ctm);

            let (x0, y0) = render.apply(0.0, -GLYPH_DESCENT);
            let (x1, y1) = render.apply(GLYPH_ADVANCE, GLYPH_ASCENT);
            let (_, baseline) = render.apply(0.0, 0.0);
            let bbox = self.to_document_space(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1));

            self.push_char(TextChar { ch, bbox }, baseline);

            let spacing = if byte == b' ' { self.word_spacing } else { 0.0 };
            let tx = (GLYPH_ADVANCE * self.font_size + self.char_spacing + spacing)
                * self.horizontal_scale;
            self.tm = Matrix::translate(tx, 0.0).then(self.tm);
        }
    }

    fn to_document_space(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> DocRect {
        let left = self.media.x0.min(self.media.x1);
        let top = self.media.y0.max(self.media.y1);
        DocRect::new(x0 - left, top - y1, x1 - left, top - y0)
    }

    fn push_char(&mut self, glyph: TextChar, baseline: f32) {
        let tolerance = glyph.bbox.height() / 2.0;

        let continues_line = self.lines.last().is_some_and(|line| {
            let Some(last) = line.chars.last() else {
                return true;
            };
            (line.baseline - baseline).abs() <= tolerance && glyph.bbox.x0 >= last.bbox.x0
        });

        if !continues_line {
            self.lines.push(TextLine { chars: Vec::new(), baseline });
            self.pending_space = false;
        }

        let pending_space = std::mem::take(&mut self.pending_space);
        let Some(line) = self.lines.last_mut() else {
            return;
        };

        if line.chars.is_empty() {
            line.baseline = baseline;
        }

        if pending_space && glyph.ch != ' ' {
            if let Some(last) = line.chars.last() {
                if last.ch != ' ' {
                    let gap = DocRect::new(last.bbox.x1, last.bbox.y0, glyph.bbox.x0, last.bbox.y1);
                    line.chars.push(TextChar { ch: ' ', bbox: gap });
                }
            }
        }

        line.chars.push(glyph);
    }
}

fn string_bytes(object: &Object) -> Option<&[u8]> {
    match object {
        Object::String(bytes, _) => Some(bytes.as_slice()),
        _ => None,
    }
}
