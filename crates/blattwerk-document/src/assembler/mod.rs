// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler — turns the final ledger and overlay set plus the
// original PDF bytes into the output PDF.
//
// Steps: merge the sources that contribute pages into one object space,
// rebuild the page tree when order or membership changed, write absolute
// rotations, paint overlays, stamp /Info, serialise. Source documents are
// cloned, never modified.

pub(crate) mod overlay;
pub(crate) mod pages;
pub(crate) mod tree;

use std::collections::{BTreeMap, HashSet};

use blattwerk_core::error::Result;
use blattwerk_core::{BlattwerkError, OverlayId, PageId};
use chrono::Utc;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use crate::ledger::PageDescriptor;
use crate::placement::PlacedOverlay;
use crate::source::SourceDocument;
use crate::split::SplitPlan;

use self::overlay::OverlayPainter;

/// What happened during one assembly pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub page_count: usize,
    pub applied_overlays: usize,
    /// Overlays left out: stale page references and undecodable images.
    pub skipped_overlays: Vec<OverlayId>,
    /// Whether the page tree was rebuilt (order, deletion, or merge).
    pub rebuilt_page_tree: bool,
}

/// One serialised output PDF.
#[derive(Debug, Clone)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    pub report: AssemblyReport,
}

/// Builds output PDFs. Stateless apart from the producer string.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    producer: String,
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self::with_producer(format!("Blattwerk {}", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_producer(producer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
        }
    }

    /// Produce the output for `pages` (in display order) from `sources`, with
    /// `overlays` painted on top. Overlay page indices are 0-indexed into
    /// `pages`; out-of-range ones are skipped and reported.
    #[instrument(skip_all, fields(sources = sources.len(), pages = pages.len(), overlays = overlays.len()))]
    pub fn assemble(
        &self,
        sources: &[SourceDocument],
        pages: &[PageDescriptor],
        overlays: &[PlacedOverlay],
    ) -> Result<AssembledPdf> {
        if pages.is_empty() {
            return Err(BlattwerkError::validation("There are no pages left to export."));
        }
        let mut ordered: Vec<&PageDescriptor> = pages.iter().collect();
        ordered.sort_by_key(|page| page.display_position);
        check_unique(&ordered)?;

        // Sources in order of first use; the first one provides the catalog.
        let mut used: Vec<usize> = Vec::new();
        for page in &ordered {
            let index = page.source_document_index;
            if index >= sources.len() {
                return Err(BlattwerkError::validation(format!(
                    "page refers to document #{} but only {} are loaded",
                    index + 1,
                    sources.len()
                )));
            }
            if !used.contains(&index) {
                used.push(index);
            }
        }

        let base = sources[used[0]].document().clone();
        let others = used[1..].iter().map(|index| sources[*index].document().clone());
        let (mut doc, page_maps) = tree::merge_documents(base, others);
        let slot: BTreeMap<usize, &BTreeMap<u32, ObjectId>> =
            used.iter().copied().zip(page_maps.iter()).collect();

        let page_ids = ordered
            .iter()
            .map(|page| {
                slot.get(&page.source_document_index)
                    .and_then(|map| map.get(&page.original_page_number))
                    .copied()
                    .ok_or_else(|| {
                        BlattwerkError::validation(format!(
                            "page {} does not exist in {}",
                            page.original_page_number,
                            sources[page.source_document_index].name()
                        ))
                    })
            })
            .collect::<Result<Vec<ObjectId>>>()?;

        let base_pages: Vec<ObjectId> = page_maps[0].values().copied().collect();
        let rebuilt = used.len() > 1 || page_ids != base_pages;
        if rebuilt {
            tree::rebuild_page_tree(&mut doc, &page_ids)?;
        }

        let mut rotated = 0;
        for (page, page_id) in ordered.iter().zip(&page_ids) {
            if pages::set_page_rotation(&mut doc, *page_id, page.rotation) {
                rotated += 1;
            }
        }

        let (applied, skipped) = apply_overlays(&mut doc, &page_ids, overlays)?;
        self.stamp_info(&mut doc);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| BlattwerkError::PdfWrite(err.to_string()))?;

        info!(
            pages = page_ids.len(),
            rotated,
            applied,
            skipped = skipped.len(),
            rebuilt,
            output_bytes = bytes.len(),
            "document assembled"
        );
        Ok(AssembledPdf {
            bytes,
            report: AssemblyReport {
                page_count: page_ids.len(),
                applied_overlays: applied,
                skipped_overlays: skipped,
                rebuilt_page_tree: rebuilt,
            },
        })
    }

    /// Concatenate whole documents in the given order.
    pub fn merge(&self, sources: &[SourceDocument]) -> Result<AssembledPdf> {
        if sources.len() < 2 {
            return Err(BlattwerkError::validation(
                "Select at least two PDF files to merge.",
            ));
        }
        let pages: Vec<PageDescriptor> = sources
            .iter()
            .enumerate()
            .flat_map(|(index, source)| whole_document(index, source))
            .enumerate()
            .map(|(position, page)| PageDescriptor {
                display_position: position + 1,
                ..page
            })
            .collect();
        self.assemble(sources, &pages, &[])
    }

    /// One independent PDF per part of `plan`, keeping existing rotations.
    #[instrument(skip_all, fields(parts = plan.part_count()))]
    pub fn split(&self, source: &SourceDocument, plan: &SplitPlan) -> Result<Vec<AssembledPdf>> {
        if plan.page_count() as usize != source.page_count() {
            return Err(BlattwerkError::validation(format!(
                "split plan is for {} pages but {} has {}",
                plan.page_count(),
                source.name(),
                source.page_count()
            )));
        }
        plan.groups()
            .into_iter()
            .map(|group| self.extract(source, &group.collect::<Vec<_>>()))
            .collect()
    }

    /// A new PDF holding the listed 1-indexed pages in the given order.
    pub fn extract(&self, source: &SourceDocument, page_numbers: &[u32]) -> Result<AssembledPdf> {
        let layout = source.layout();
        let pages = page_numbers
            .iter()
            .enumerate()
            .map(|(position, number)| {
                let rotation = (*number as usize)
                    .checked_sub(1)
                    .and_then(|index| layout.initial_rotations.get(index))
                    .copied()
                    .ok_or_else(|| {
                        BlattwerkError::validation(format!(
                            "page {number} is outside 1..={}",
                            layout.page_count()
                        ))
                    })?;
                Ok(PageDescriptor {
                    id: PageId::new(),
                    source_document_index: 0,
                    original_page_number: *number,
                    display_position: position + 1,
                    rotation,
                    selected: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.assemble(std::slice::from_ref(source), &pages, &[])
    }

    fn stamp_info(&self, doc: &mut Document) {
        let timestamp = Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) if doc.get_dictionary(id).is_ok() => id,
            _ => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };
        let Ok(info) = doc.get_dictionary_mut(info_id) else {
            warn!(?info_id, "could not update /Info");
            return;
        };
        info.set("Producer", Object::string_literal(self.producer.as_str()));
        info.set("ModDate", Object::string_literal(timestamp));
    }
}

fn whole_document(index: usize, source: &SourceDocument) -> Vec<PageDescriptor> {
    source
        .layout()
        .initial_rotations
        .into_iter()
        .enumerate()
        .map(|(page_index, rotation)| PageDescriptor {
            id: PageId::new(),
            source_document_index: index,
            original_page_number: page_index as u32 + 1,
            display_position: 0,
            rotation,
            selected: false,
        })
        .collect()
}

fn check_unique(pages: &[&PageDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for page in pages {
        if !seen.insert((page.source_document_index, page.original_page_number)) {
            return Err(BlattwerkError::validation(format!(
                "page {} appears twice in the output",
                page.original_page_number
            )));
        }
    }
    Ok(())
}

/// Paint overlays page by page, in placement order within each page.
fn apply_overlays(
    doc: &mut Document,
    page_ids: &[ObjectId],
    overlays: &[PlacedOverlay],
) -> Result<(usize, Vec<OverlayId>)> {
    let mut by_page: BTreeMap<usize, Vec<&PlacedOverlay>> = BTreeMap::new();
    let mut skipped = Vec::new();
    for overlay in overlays {
        if overlay.page_index < page_ids.len() {
            by_page.entry(overlay.page_index).or_default().push(overlay);
        } else {
            warn!(
                overlay = %overlay.id,
                page_index = overlay.page_index,
                pages = page_ids.len(),
                "overlay refers to a missing page, skipped"
            );
            skipped.push(overlay.id);
        }
    }

    let mut painter = OverlayPainter::new(doc);
    let mut applied = 0;
    for (page_index, on_page) in by_page {
        let failed = painter.paint_page(page_ids[page_index], &on_page)?;
        applied += on_page.len() - failed.len();
        skipped.extend(failed.iter().map(|overlay| overlay.id));
        debug!(page_index, drawn = on_page.len() - failed.len(), "page overlays done");
    }
    Ok((applied, skipped))
}
