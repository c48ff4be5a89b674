// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay painting: signature images become image XObjects drawn with a
// `cm`/`Do` pair, redaction marks become filled black rectangles. The page's
// existing content is wrapped in q/Q so its graphics state cannot leak into
// ours.

use std::collections::HashMap;

use blattwerk_core::error::Result;
use blattwerk_core::{BlattwerkError, Rotation};
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, warn};

use crate::assembler::pages::{page_box, page_rotation};
use crate::assembler::tree::{inherited, resolve};
use crate::geometry::{PointRect, displayed_to_unrotated, percent_to_points};
use crate::placement::{OverlayKind, PlacedOverlay};
use crate::raster::{ImageKind, ImageRef};

/// Writes overlays into one document, embedding each distinct signature
/// image only once.
pub(crate) struct OverlayPainter<'a> {
    doc: &'a mut Document,
    embedded: HashMap<(usize, usize), ObjectId>,
}

impl<'a> OverlayPainter<'a> {
    pub(crate) fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            embedded: HashMap::new(),
        }
    }

    /// Paint `overlays` (already in placement order) onto one page. Returns
    /// the overlays that could not be drawn; the rest are applied even if
    /// some fail.
    pub(crate) fn paint_page(
        &mut self,
        page_id: ObjectId,
        overlays: &[&PlacedOverlay],
    ) -> Result<Vec<PlacedOverlay>> {
        let page = page_box(self.doc, page_id);
        let rotation = page_rotation(self.doc, page_id);

        let mut operations = Vec::new();
        let mut xobjects: Vec<ObjectId> = Vec::new();
        let mut skipped = Vec::new();

        for overlay in overlays {
            let unrotated = displayed_to_unrotated(&overlay.rect, rotation);
            let target = percent_to_points(&unrotated, &page);
            match &overlay.kind {
                OverlayKind::Redaction => operations.extend(redaction_ops(&target)),
                OverlayKind::Signature { image } => match self.embed(image) {
                    Ok(xobject) => {
                        xobjects.push(xobject);
                        // Named later once the resource dictionary is known.
                        operations.extend(image_ops(&target, rotation, xobjects.len() - 1));
                    }
                    Err(err) => {
                        warn!(overlay = %overlay.id, %err, "signature image skipped");
                        skipped.push((*overlay).clone());
                    }
                },
            }
        }

        if operations.is_empty() {
            return Ok(skipped);
        }

        let names = self.register_xobjects(page_id, &xobjects)?;
        for operation in operations.iter_mut().filter(|op| op.operator == "Do") {
            let name = match operation.operands.first() {
                Some(Object::Integer(slot)) => names.get(*slot as usize).cloned(),
                _ => None,
            };
            if let Some(name) = name {
                operation.operands = vec![Object::Name(name)];
            }
        }
        self.append_content(page_id, operations)?;
        debug!(?page_id, drawn = overlays.len() - skipped.len(), "overlays painted");
        Ok(skipped)
    }

    /// Embed (or reuse) the XObject for a signature image.
    fn embed(&mut self, image: &ImageRef) -> Result<ObjectId> {
        let key = (image.bytes().as_ptr() as usize, image.bytes().len());
        if let Some(id) = self.embedded.get(&key) {
            return Ok(*id);
        }
        let id = match (image.kind(), jpeg_components(image.bytes())) {
            (ImageKind::Jpeg, Some(components @ (1 | 3))) => self.embed_jpeg(image, components),
            _ => self.embed_decoded(&image.decode()?)?,
        };
        self.embedded.insert(key, id);
        Ok(id)
    }

    /// JPEG data is stored untouched behind a DCTDecode filter.
    fn embed_jpeg(&mut self, image: &ImageRef, components: u8) -> ObjectId {
        let color_space = if components == 1 { "DeviceGray" } else { "DeviceRGB" };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width_px()),
            "Height" => i64::from(image.height_px()),
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        self.doc.add_object(Stream::new(dict, image.bytes().to_vec()))
    }

    /// Everything else is decoded to RGB with a separate soft mask for any
    /// transparency, both Flate-compressed.
    fn embed_decoded(&mut self, decoded: &DynamicImage) -> Result<ObjectId> {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity(plane_len(width, height, 3));
        let mut alpha = Vec::with_capacity(plane_len(width, height, 1));
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut dict = image_dict(width, height, "DeviceRGB");
        if alpha.iter().any(|a| *a < u8::MAX) {
            let mask = compressed(image_dict(width, height, "DeviceGray"), alpha)?;
            dict.set("SMask", self.doc.add_object(mask));
        }
        let stream = compressed(dict, rgb)?;
        Ok(self.doc.add_object(stream))
    }

    /// Add the XObjects to the page's own resource dictionary under fresh
    /// names. Shared (referenced or inherited) dictionaries are copied onto
    /// the page before being changed, so other pages are unaffected.
    fn register_xobjects(&mut self, page_id: ObjectId, xobjects: &[ObjectId]) -> Result<Vec<Vec<u8>>> {
        let mut resources = match inherited(self.doc, page_id, b"Resources") {
            Some(value) => match resolve(self.doc, value) {
                Object::Dictionary(dict) => dict.clone(),
                _ => Dictionary::new(),
            },
            None => Dictionary::new(),
        };
        let mut registry = match resources.get(b"XObject") {
            Ok(value) => match resolve(self.doc, value) {
                Object::Dictionary(dict) => dict.clone(),
                _ => Dictionary::new(),
            },
            Err(_) => Dictionary::new(),
        };

        let mut names = Vec::with_capacity(xobjects.len());
        let mut counter = 0usize;
        for xobject in xobjects {
            let name = loop {
                counter += 1;
                let candidate = format!("BwImg{counter}").into_bytes();
                if !registry.has(&candidate) {
                    break candidate;
                }
            };
            registry.set(name.clone(), Object::Reference(*xobject));
            names.push(name);
        }
        resources.set("XObject", Object::Dictionary(registry));

        self.page_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(names)
    }

    /// Contents become `[q, …existing, Q + overlays]`.
    fn append_content(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> Result<()> {
        let contents = self.page_mut(page_id)?.get(b"Contents").ok().cloned();
        let existing: Vec<Object> = match contents {
            Some(Object::Array(items)) => items,
            // An indirect array is flattened; an indirect stream is kept as is.
            Some(Object::Reference(id)) => match self.doc.get_object(id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Stream(stream)) => vec![Object::Stream(stream)],
            _ => Vec::new(),
        };
        let existing: Vec<Object> = existing
            .into_iter()
            .map(|item| match item {
                Object::Stream(stream) => Object::Reference(self.doc.add_object(stream)),
                other => other,
            })
            .collect();

        let mut ours = vec![Operation::new("Q", vec![])];
        ours.extend(operations);
        let encoded = Content { operations: ours }
            .encode()
            .map_err(|err| BlattwerkError::PdfWrite(format!("overlay content: {err}")))?;

        let open = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(open));
        contents.extend(existing);
        contents.push(Object::Reference(close));
        self.page_mut(page_id)?.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn page_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        self.doc
            .get_dictionary_mut(page_id)
            .map_err(|err| BlattwerkError::PdfWrite(format!("page object {page_id:?} unreadable: {err}")))
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

/// Bytes in a `width` x `height` sample plane, computed without `u32`
/// overflow.
fn plane_len(width: u32, height: u32, channels: usize) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(channels)
}

fn compressed(dict: Dictionary, data: Vec<u8>) -> Result<Stream> {
    let mut stream = Stream::new(dict, data);
    stream
        .compress()
        .map_err(|err| BlattwerkError::PdfWrite(format!("image compression failed: {err}")))?;
    Ok(stream)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn redaction_ops(target: &PointRect) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
        Operation::new(
            "re",
            vec![real(target.x), real(target.y), real(target.width), real(target.height)],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Draw the unit image square into `target`, turned against the page's
/// rotation so the image reads upright on screen. The `Do` operand holds the
/// XObject slot until the resource name is assigned.
fn image_ops(target: &PointRect, rotation: Rotation, slot: usize) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", image_matrix(target, rotation).into_iter().map(real).collect()),
        Operation::new("Do", vec![Object::Integer(slot as i64)]),
        Operation::new("Q", vec![]),
    ]
}

/// `[a b c d e f]` mapping the image's unit square onto `target`.
pub(crate) fn image_matrix(target: &PointRect, rotation: Rotation) -> [f64; 6] {
    let PointRect {
        x,
        y,
        width: w,
        height: h,
    } = *target;
    match rotation {
        Rotation::Deg0 => [w, 0.0, 0.0, h, x, y],
        Rotation::Deg90 => [0.0, h, -w, 0.0, x + w, y],
        Rotation::Deg180 => [-w, 0.0, 0.0, -h, x + w, y + h],
        Rotation::Deg270 => [0.0, -h, w, 0.0, x, y + h],
    }
}

/// Number of colour components declared by a JPEG's start-of-frame marker.
pub(crate) fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = usize::from(u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]));
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            return bytes.get(pos + 9).copied();
        }
        if marker == 0xDA || length < 2 {
            return None;
        }
        pos += 2 + length;
    }
    None
}
