use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

/// Maximum outline nesting followed before giving up on a branch.
const MAX_DEPTH: usize = 64;

/// One table-of-contents entry. `level` starts at 1; `page` is the
/// zero-based target page, `None` when the destination cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub level: usize,
    pub title: String,
    pub page: Option<u32>,
}

/// Flattened outline in document order (depth first).
pub fn read_outline(doc: &Document, page_ids: &[ObjectId]) -> Vec<OutlineEntry> {
    let Some(catalog) = catalog(doc) else {
        return Vec::new();
    };

    let Some(outlines) = catalog.get(b"Outlines").ok().and_then(|obj| dict(doc, obj)) else {
        return Vec::new();
    };

    let pages: HashMap<ObjectId, u32> =
        page_ids.iter().enumerate().map(|(index, id)| (*id, index as u32)).collect();

    let mut walker = OutlineWalker { doc, catalog, pages, visited: HashSet::new(), out: Vec::new() };
    if let Ok(Object::Reference(first)) = outlines.get(b"First") {
        walker.walk_siblings(*first, 1);
    }

    walker.out
}

struct OutlineWalker<'a> {
    doc: &'a Document,
    catalog: &'a Dictionary,
    pages: HashMap<ObjectId, u32>,
    visited: HashSet<ObjectId>,
    out: Vec<OutlineEntry>,
}

impl<'a> OutlineWalker<'a> {
    fn walk_siblings(&mut self, first: ObjectId, level: usize) {
        if level > MAX_DEPTH {
            log::warn!("outline nesting deeper than {MAX_DEPTH}, truncating");
            return;
        }

        let mut next = Some(first);
        while let Some(id) = next {
            if !self.visited.insert(id) {
                log::warn!("outline cycle at object {id:?}");
                return;
            }

            let doc = self.doc;
            let Ok(item) = doc.get_dictionary(id) else {
                return;
            };

            let title = item.get(b"Title").ok().and_then(|obj| text_string(doc, obj));
            let page = self.item_target(item);
            self.out.push(OutlineEntry { level, title: title.unwrap_or_default(), page });

            if let Ok(Object::Reference(child)) = item.get(b"First") {
                self.walk_siblings(*child, level + 1);
            }

            next = match item.get(b"Next") {
                Ok(Object::Reference(sibling)) => Some(*sibling),
                _ => None,
            };
        }
    }

    fn item_target(&self, item: &'a Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.destination(dest, 0);
        }

        let action = item.get(b"A").ok().and_then(|obj| dict(self.doc, obj))?;
        let kind = action.get(b"S").ok().and_then(|obj| obj.as_name().ok())?;
        if kind != b"GoTo" {
            return None;
        }

        self.destination(action.get(b"D").ok()?, 0)
    }

    fn destination(&self, dest: &'a Object, depth: usize) -> Option<u32> {
        if depth > 4 {
            return None;
        }

        match resolve(self.doc, dest)? {
            Object::Array(items) => match items.first()? {
                Object::Reference(page_id) => self.pages.get(page_id).copied(),
                _ => None,
            },
            Object::Dictionary(wrapper) => self.destination(wrapper.get(b"D").ok()?, depth + 1),
            Object::Name(name) | Object::String(name, _) => {
                let target = self.named_destination(name)?;
                self.destination(target, depth + 1)
            }
            _ => None,
        }
    }

    /// Looks a name up in the catalog `/Dests` dictionary, then in the
    /// `/Names /Dests` name tree.
    fn named_destination(&self, name: &[u8]) -> Option<&'a Object> {
        if let Some(dests) = self.catalog.get(b"Dests").ok().and_then(|obj| dict(self.doc, obj)) {
            if let Ok(found) = dests.get(name) {
                return Some(found);
            }
        }

        let names = self.catalog.get(b"Names").ok().and_then(|obj| dict(self.doc, obj))?;
        let tree = names.get(b"Dests").ok().and_then(|obj| dict(self.doc, obj))?;
        self.search_name_tree(tree, name, 0)
    }

    fn search_name_tree(
        &self,
        node: &'a Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        if depth > MAX_DEPTH {
            return None;
        }

        let doc = self.doc;

        if let Some(Object::Array(pairs)) = node.get(b"Names").ok().and_then(|obj| resolve(doc, obj)) {
            for pair in pairs.chunks(2) {
                if let [Object::String(key, _), value] = pair {
                    if key.as_slice() == name {
                        return Some(value);
                    }
                }
            }
        }

        if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|obj| resolve(doc, obj)) {
            for kid in kids {
                let Some(kid) = dict(doc, kid) else {
                    continue;
                };
                if let Some(found) = self.search_name_tree(kid, name, depth + 1) {
                    return Some(found);
                }
            }
        }

        None
    }
}

fn catalog(doc: &Document) -> Option<&Dictionary> {
    doc.trailer.get(b"Root").ok().and_then(|root| dict(doc, root))
}

pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn text_string(doc: &Document, object: &Object) -> Option<String> {
    match resolve(doc, object)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 with a byte order mark,
/// otherwise single-byte text.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> =
            utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }

    bytes.iter().map(|&byte| byte as char).collect()
}
