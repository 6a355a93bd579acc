//! In-memory PDF fixtures for tests.

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

#[derive(Debug, Clone)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub content: String,
}

impl PageSpec {
    pub fn with_content(width: f32, height: f32, content: impl Into<String>) -> Self {
        Self { width, height, content: content.into() }
    }

    /// Helvetica 12pt lines starting one inch from the top-left corner,
    /// 14pt apart.
    pub fn with_lines(width: f32, height: f32, lines: &[&str]) -> Self {
        let mut content = format!("BT /F1 12 Tf 14 TL 72 {} Td", height - 72.0);
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                content.push_str(" T*");
            }
            content.push_str(&format!(" ({}) Tj", escape(line)));
        }
        content.push_str(" ET");

        Self::with_content(width, height, content)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Builds a document with the given pages and an outline described as
/// `(level, title, page_index)` entries, levels starting at 1.
pub fn build_pdf(pages: &[PageSpec], outline: &[(usize, &str, usize)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let page_ids: Vec<ObjectId> = pages
        .iter()
        .map(|page| {
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, page.content.clone().into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width.into()),
                    Object::Real(page.height.into()),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            })
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    if !outline.is_empty() {
        catalog.set("Outlines", build_outline(&mut doc, outline, &page_ids));
    }

    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture should serialize");
    bytes
}

fn build_outline(
    doc: &mut Document,
    entries: &[(usize, &str, usize)],
    page_ids: &[ObjectId],
) -> ObjectId {
    let root_id = doc.new_object_id();
    let ids: Vec<ObjectId> = entries.iter().map(|_| doc.new_object_id()).collect();

    // Parent of each entry, `None` for top level.
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(entries.len());
    let mut stack: Vec<usize> = Vec::new();
    for (index, (level, _, _)) in entries.iter().enumerate() {
        while stack.len() >= *level {
            stack.pop();
        }
        parents.push(stack.last().copied());
        stack.push(index);
    }

    let children_of = |parent: Option<usize>| -> Vec<usize> {
        (0..entries.len()).filter(|index| parents[*index] == parent).collect()
    };

    for (index, (_, title, page)) in entries.iter().enumerate() {
        let siblings = children_of(parents[index]);
        let position = siblings.iter().position(|sibling| *sibling == index).unwrap_or(0);
        let parent_id = parents[index].map(|parent| ids[parent]).unwrap_or(root_id);

        let mut item = dictionary! {
            "Title" => Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
            "Parent" => parent_id,
        };

        if let Some(page_id) = page_ids.get(*page) {
            item.set("Dest", vec![Object::Reference(*page_id), "Fit".into()]);
        }
        if position > 0 {
            item.set("Prev", ids[siblings[position - 1]]);
        }
        if let Some(next) = siblings.get(position + 1) {
            item.set("Next", ids[*next]);
        }

        let children = children_of(Some(index));
        if let (Some(first), Some(last)) = (children.first(), children.last()) {
            item.set("First", ids[*first]);
            item.set("Last", ids[*last]);
            item.set("Count", children.len() as i64);
        }

        doc.objects.insert(ids[index], Object::Dictionary(item));
    }

    let top = children_of(None);
    let mut root = dictionary! {
        "Type" => "Outlines",
        "Count" => top.len() as i64,
    };
    if let (Some(first), Some(last)) = (top.first(), top.last()) {
        root.set("First", ids[*first]);
        root.set("Last", ids[*last]);
    }
    doc.objects.insert(root_id, Object::Dictionary(root));

    root_id
}

/// Re-serializes `bytes` with a standard security handler entry in the
/// trailer. The key material is not valid, so no password opens it.
pub fn with_encrypt_entry(bytes: &[u8]) -> Vec<u8> {
    let mut doc = Document::load_mem(bytes).expect("fixture should parse");
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::String(vec![0x11; 32], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0x22; 32], StringFormat::Hexadecimal),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture should serialize");
    out
}
