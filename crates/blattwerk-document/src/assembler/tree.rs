// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page tree plumbing: inherited attribute lookup, merging several documents
// into one object space, and rebuilding a flat /Pages node in a new order.

use std::collections::BTreeMap;

use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against malformed trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// Find `key` on the page or the nearest ancestor that defines it. The value
/// is returned as stored (it may be a reference).
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    warn!(?page_id, "page tree deeper than expected, giving up on inheritance");
    None
}

/// Follow a reference to its target; direct objects are returned as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(&Object::Null),
        other => other,
    }
}

/// Integer or real as `f64`.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// The `/Pages` root referenced from the catalog.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|err| BlattwerkError::DocumentLoad(format!("no page tree: {err}")))
}

/// Merge `others` into `base`'s object space. Each returned map translates
/// a 1-indexed page number to the page's object id in `base`; index 0 is the
/// base document itself. The other documents' catalogs become unreachable
/// and disappear on the next prune.
pub(crate) fn merge_documents(
    mut base: Document,
    others: impl IntoIterator<Item = Document>,
) -> (Document, Vec<BTreeMap<u32, ObjectId>>) {
    let mut page_maps = vec![base.get_pages()];
    for mut other in others {
        other.renumber_objects_with(base.max_id + 1);
        page_maps.push(other.get_pages());
        base.max_id = base.max_id.max(other.max_id);
        if let Some(highest) = other.objects.keys().map(|(id, _)| *id).max() {
            base.max_id = base.max_id.max(highest);
        }
        base.objects.extend(other.objects);
    }
    debug!(documents = page_maps.len(), objects = base.objects.len(), "documents merged");
    (base, page_maps)
}

/// Replace the page tree with a single flat /Pages node holding `pages` in
/// order. Inheritable attributes are copied onto every page first so no page
/// loses its resources or geometry when its old ancestors are dropped.
pub(crate) fn rebuild_page_tree(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    let root = pages_root(doc)?;

    let inherited_values: Vec<Vec<(&[u8], Object)>> = pages
        .iter()
        .map(|page_id| {
            INHERITABLE
                .iter()
                .filter_map(|key| inherited(doc, *page_id, key).map(|value| (*key, value.clone())))
                .collect()
        })
        .collect();

    for (page_id, values) in pages.iter().zip(inherited_values) {
        let page = doc.get_dictionary_mut(*page_id).map_err(|err| {
            BlattwerkError::PdfWrite(format!("page object {page_id:?} unreadable: {err}"))
        })?;
        for (key, value) in values {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
        page.set("Parent", Object::Reference(root));
    }

    let kids: Vec<Object> = pages.iter().copied().map(Object::Reference).collect();
    let mut node = Dictionary::new();
    node.set("Type", Object::Name(b"Pages".to_vec()));
    node.set("Kids", Object::Array(kids));
    node.set("Count", Object::Integer(pages.len() as i64));
    doc.objects.insert(root, Object::Dictionary(node));

    let pruned = doc.prune_objects();
    debug!(pages = pages.len(), pruned = pruned.len(), "page tree rebuilt");
    Ok(())
}
