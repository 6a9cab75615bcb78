//! Outline serialization into the PDF object tree.

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, StringFormat};

use crate::error::{Error, Result};
use crate::model::Outline;

/// One outline item while the tree is being laid out.
struct Node {
    id: ObjectId,
    entry: usize,
    children: Vec<usize>,
}

/// Replace the document outline with `outline`.
///
/// Level-1 items are shown; items with children start collapsed. Every item
/// points at the top of its target page.
pub fn write_outline(
    doc: &mut LopdfDocument,
    page_ids: &[ObjectId],
    outline: &Outline,
) -> Result<()> {
    outline.validate()?;

    let entries = outline.entries();
    let root_id = doc.new_object_id();
    let mut nodes: Vec<Node> = Vec::with_capacity(entries.len());
    let mut top_level: Vec<usize> = Vec::new();
    // Ancestors of the current position; index i holds the open item at level i + 1
    let mut path: Vec<usize> = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        path.truncate(entry.level as usize - 1);
        let node = nodes.len();
        nodes.push(Node {
            id: doc.new_object_id(),
            entry: i,
            children: Vec::new(),
        });
        match path.last() {
            Some(&parent) => nodes[parent].children.push(node),
            None => top_level.push(node),
        }
        path.push(node);
    }

    let links = link_siblings(&nodes, &top_level, root_id);

    for (idx, node) in nodes.iter().enumerate() {
        let entry = &entries[node.entry];
        let page_id = page_ids
            .get((entry.page_number as usize).wrapping_sub(1))
            .copied()
            .ok_or(Error::PageOutOfRange(
                entry.page_number as usize,
                page_ids.len(),
            ))?;

        let link = &links[idx];
        let mut dict = Dictionary::new();
        dict.set("Title", text_string(&entry.title));
        dict.set("Parent", link.parent);
        dict.set(
            "Dest",
            vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())],
        );
        if let Some(prev) = link.prev {
            dict.set("Prev", prev);
        }
        if let Some(next) = link.next {
            dict.set("Next", next);
        }

        if let (Some(&first), Some(&last)) = (node.children.first(), node.children.last()) {
            dict.set("First", nodes[first].id);
            dict.set("Last", nodes[last].id);
            dict.set("Count", -(node.children.len() as i64));
        }

        doc.objects.insert(node.id, Object::Dictionary(dict));
    }

    let mut root = Dictionary::new();
    root.set("Type", Object::Name(b"Outlines".to_vec()));
    if let (Some(&first), Some(&last)) = (top_level.first(), top_level.last()) {
        root.set("First", nodes[first].id);
        root.set("Last", nodes[last].id);
    }
    root.set("Count", top_level.len() as i64);
    doc.objects.insert(root_id, Object::Dictionary(root));

    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| Error::PdfWrite(format!("missing document catalog: {}", e)))?;
    let catalog = doc
        .get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::PdfWrite(format!("invalid document catalog: {}", e)))?;
    catalog.set("Outlines", root_id);
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    log::debug!(
        "Wrote outline with {} items ({} top-level)",
        nodes.len(),
        top_level.len()
    );
    Ok(())
}

/// Drop unreachable objects (such as a replaced outline) and serialize.
pub fn save_document(doc: &mut LopdfDocument, compress: bool) -> Result<Vec<u8>> {
    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("Pruned {} unreachable objects", pruned.len());
    }
    if compress {
        doc.compress();
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::PdfWrite(e.to_string()))?;
    Ok(buffer)
}

/// Parent and sibling references of an outline item.
struct Link {
    parent: ObjectId,
    prev: Option<ObjectId>,
    next: Option<ObjectId>,
}

fn link_siblings(nodes: &[Node], top_level: &[usize], root_id: ObjectId) -> Vec<Link> {
    let mut links: Vec<Link> = nodes
        .iter()
        .map(|_| Link {
            parent: root_id,
            prev: None,
            next: None,
        })
        .collect();

    let groups = std::iter::once((root_id, top_level))
        .chain(nodes.iter().map(|n| (n.id, n.children.as_slice())));
    for (parent, siblings) in groups {
        for (pos, &idx) in siblings.iter().enumerate() {
            links[idx].parent = parent;
            if pos > 0 {
                links[idx].prev = Some(nodes[siblings[pos - 1]].id);
            }
            links[idx].next = siblings.get(pos + 1).map(|&n| nodes[n].id);
        }
    }
    links
}

/// Encode a title as a PDF text string: literal for ASCII, UTF-16BE otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
