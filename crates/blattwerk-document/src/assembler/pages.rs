// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page geometry: the visible box and the effective /Rotate.

use blattwerk_core::Rotation;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::assembler::tree::{inherited, number, resolve};
use crate::geometry::PageBox;

/// Effective rotation of a page, inherited values included. Values that are
/// not quarter turns are treated as upright.
pub(crate) fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    let Some(degrees) = stored_rotation(doc, page_id) else {
        return Rotation::Deg0;
    };
    quarter_turn(degrees).unwrap_or_else(|| {
        warn!(?page_id, degrees, "ignoring non-quarter-turn /Rotate");
        Rotation::Deg0
    })
}

/// Overwrite the page's rotation with an absolute value. Only writes when
/// the stored /Rotate does not already say exactly that, so untouched pages
/// stay byte-identical in their dictionaries while invalid values (45, a
/// non-number) are replaced by the rotation the overlays were mapped for.
pub(crate) fn set_page_rotation(doc: &mut Document, page_id: ObjectId, rotation: Rotation) -> bool {
    let already = match stored_rotation(doc, page_id) {
        None => rotation == Rotation::Deg0,
        Some(degrees) => quarter_turn(degrees) == Some(rotation),
    };
    if already {
        return false;
    }
    match doc.get_dictionary_mut(page_id) {
        Ok(page) => {
            page.set("Rotate", Object::Integer(i64::from(rotation.degrees())));
            debug!(?page_id, degrees = rotation.degrees(), "rotation set");
            true
        }
        Err(err) => {
            warn!(?page_id, %err, "page dictionary missing, rotation not applied");
            false
        }
    }
}

/// Raw /Rotate in effect for the page, inherited values included. A value
/// that is present but not a number reads as NaN.
fn stored_rotation(doc: &Document, page_id: ObjectId) -> Option<f64> {
    inherited(doc, page_id, b"Rotate").map(|value| number(resolve(doc, value)).unwrap_or(f64::NAN))
}

fn quarter_turn(degrees: f64) -> Option<Rotation> {
    if degrees.fract() != 0.0 {
        return None;
    }
    Rotation::from_degrees(degrees as i64)
}

/// The area a viewer shows: CropBox, else MediaBox, else US Letter.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .find_map(|key| inherited(doc, page_id, key).and_then(|value| rectangle(doc, value)))
        .unwrap_or_else(PageBox::letter)
}

fn rectangle(doc: &Document, value: &Object) -> Option<PageBox> {
    let Object::Array(items) = resolve(doc, value) else {
        return None;
    };
    let coords: Vec<f64> = items
        .iter()
        .filter_map(|item| number(resolve(doc, item)))
        .collect();
    match coords.as_slice() {
        [llx, lly, urx, ury] => {
            let rect = PageBox::from_corners(*llx, *lly, *urx, *ury);
            (rect.width > 0.0 && rect.height > 0.0).then_some(rect)
        }
        _ => None,
    }
}
