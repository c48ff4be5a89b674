// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editing session — one open editor: the loaded sources, the page ledger,
// the placement engine, the signature workflow and the job gates that keep
// exports and previews from racing each other.
//
// Ledger edits go through `with_ledger` so overlays follow their pages when
// pages move and disappear with them when pages are deleted.

pub mod jobs;

use std::collections::HashMap;
use std::sync::Arc;

use blattwerk_core::error::Result;
use blattwerk_core::{
    AppConfig, BlattwerkError, OutputKind, OverlayId, PageId, PageViewport, RedactionArea,
    Rotation, output_file_name,
};
use image::{RgbaImage, imageops};
use tracing::{debug, info, instrument, warn};

use crate::assembler::{AssembledPdf, AssemblyReport, DocumentAssembler};
use crate::geometry::PercentPoint;
use crate::ledger::{PageDescriptor, PageLedger};
use crate::placement::{PlacedOverlay, PlacementEngine, PlacementSettings};
use crate::signature::SignatureFlow;
use crate::source::SourceDocument;
use crate::split::SplitPlan;

pub use jobs::{AssemblyGate, AssemblyPermit, PageRenderer, PreviewScheduler, PreviewTicket};

/// A finished export, ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub report: AssemblyReport,
}

/// Everything an export needs, detached from the session so it can run on a
/// worker thread.
struct ExportJob {
    assembler: DocumentAssembler,
    sources: Vec<SourceDocument>,
    pages: Vec<PageDescriptor>,
    overlays: Vec<PlacedOverlay>,
    file_name: String,
}

impl ExportJob {
    fn run(self) -> Result<ExportedFile> {
        let AssembledPdf { bytes, report } =
            self.assembler
                .assemble(&self.sources, &self.pages, &self.overlays)?;
        Ok(ExportedFile {
            file_name: self.file_name,
            bytes,
            report,
        })
    }
}

pub struct EditSession {
    sources: Vec<SourceDocument>,
    ledger: PageLedger,
    placement: PlacementEngine,
    signature: SignatureFlow,
    assembler: DocumentAssembler,
    gate: AssemblyGate,
    previews: Arc<PreviewScheduler>,
}

impl EditSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            sources: Vec::new(),
            ledger: PageLedger::new(config.history_limit),
            placement: PlacementEngine::new(PlacementSettings::from(config)),
            signature: SignatureFlow::new(),
            assembler: DocumentAssembler::new(),
            gate: AssemblyGate::new(),
            previews: Arc::new(PreviewScheduler::new()),
        }
    }

    // -- Documents ------------------------------------------------------------

    /// Replace the session's documents. Every file is parsed before anything
    /// changes, so one bad file leaves the session as it was.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn load_documents(&mut self, documents: Vec<(String, Vec<u8>)>) -> Result<()> {
        let sources = documents
            .into_iter()
            .map(|(name, bytes)| SourceDocument::load(&name, bytes))
            .collect::<Result<Vec<_>>>()?;
        let layouts: Vec<_> = sources.iter().map(SourceDocument::layout).collect();
        self.ledger.load(&layouts);
        self.placement = PlacementEngine::new(*self.placement.settings());
        self.previews.invalidate_all();
        self.sources = sources;
        info!(pages = self.ledger.len(), "documents loaded into session");
        Ok(())
    }

    /// Append one more document after the current pages. Returns its index.
    pub fn add_document(&mut self, name: &str, bytes: Vec<u8>) -> Result<usize> {
        let source = SourceDocument::load(name, bytes)?;
        let index = self.ledger.append_document(&source.layout());
        if index != self.sources.len() {
            warn!(index, sources = self.sources.len(), "document index out of step");
        }
        self.sources.push(source);
        Ok(index)
    }

    pub fn sources(&self) -> &[SourceDocument] {
        &self.sources
    }

    // -- Pages ----------------------------------------------------------------

    pub fn ledger(&self) -> &PageLedger {
        &self.ledger
    }

    /// Run a ledger edit, then move overlays along with their pages. Overlays
    /// on pages that no longer exist are removed.
    pub fn with_ledger<R>(&mut self, edit: impl FnOnce(&mut PageLedger) -> R) -> R {
        let before: Vec<PageId> = self.ledger.pages().iter().map(|page| page.id).collect();
        let result = edit(&mut self.ledger);
        let after: HashMap<PageId, usize> = self
            .ledger
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| (page.id, index))
            .collect();
        let dropped = self
            .placement
            .remap_pages(|old| before.get(old).and_then(|id| after.get(id)).copied());
        if dropped > 0 {
            info!(dropped, "overlays removed with their pages");
        }
        result
    }

    /// Displayed shape of a working page at one pixel per point.
    pub fn page_viewport(&self, page_index: usize) -> Option<PageViewport> {
        let page = self.ledger.pages().get(page_index)?;
        self.sources
            .get(page.source_document_index)?
            .displayed_viewport(page.original_page_number, page.rotation)
    }

    // -- Overlays -------------------------------------------------------------

    pub fn placement(&self) -> &PlacementEngine {
        &self.placement
    }

    pub fn placement_mut(&mut self) -> &mut PlacementEngine {
        &mut self.placement
    }

    pub fn signature(&self) -> &SignatureFlow {
        &self.signature
    }

    pub fn signature_mut(&mut self) -> &mut SignatureFlow {
        &mut self.signature
    }

    /// Stamp the configured signature onto a working page.
    pub fn place_signature(
        &mut self,
        page_index: usize,
        center: PercentPoint,
        viewport: Option<PageViewport>,
    ) -> Result<OverlayId> {
        if page_index >= self.ledger.len() {
            return Err(BlattwerkError::validation(format!(
                "page {} does not exist",
                page_index + 1
            )));
        }
        let viewport = viewport
            .or_else(|| self.page_viewport(page_index))
            .unwrap_or(PageViewport::new(612.0, 792.0));
        self.signature
            .place_at(&mut self.placement, page_index, center, viewport)
    }

    /// Mark a redaction between two pointer positions on a working page.
    pub fn mark_redaction(
        &mut self,
        page_index: usize,
        start: PercentPoint,
        end: PercentPoint,
    ) -> Result<OverlayId> {
        if page_index >= self.ledger.len() {
            return Err(BlattwerkError::validation(format!(
                "page {} does not exist",
                page_index + 1
            )));
        }
        Ok(self.placement.mark_redaction(page_index, start, end))
    }

    pub fn redaction_areas(&self) -> Vec<RedactionArea> {
        self.placement.redaction_areas()
    }

    // -- Export ---------------------------------------------------------------

    /// What the current edit state amounts to, for naming the output.
    pub fn default_output_kind(&self) -> OutputKind {
        let overlays = self.placement.overlays();
        if overlays.iter().any(|overlay| !overlay.is_signature()) {
            OutputKind::Redacted
        } else if !overlays.is_empty() {
            OutputKind::Signed
        } else if self.sources.len() > 1 {
            OutputKind::Merged
        } else {
            OutputKind::Organized
        }
    }

    pub fn output_name(&self, kind: OutputKind) -> String {
        let input = self.sources.first().map_or("document", SourceDocument::name);
        output_file_name(input, kind)
    }

    /// Assemble on the calling thread. Fails with
    /// [`BlattwerkError::AssemblyInProgress`] while another export runs.
    pub fn export(&self) -> Result<ExportedFile> {
        let _permit = self.gate.try_acquire()?;
        self.export_job()?.run()
    }

    /// Assemble on a blocking worker so the caller's runtime stays
    /// responsive. The gate is held until the worker finishes.
    pub async fn export_async(&self) -> Result<ExportedFile> {
        let permit = self.gate.try_acquire()?;
        let job = self.export_job()?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job.run()
        })
        .await
        .map_err(|err| BlattwerkError::PdfWrite(format!("export worker failed: {err}")))?
    }

    /// Split the working page order into parts. Overlays travel with their
    /// pages into whichever part holds them.
    #[instrument(skip_all, fields(parts = plan.part_count()))]
    pub fn export_split(&self, plan: &SplitPlan) -> Result<Vec<ExportedFile>> {
        let _permit = self.gate.try_acquire()?;
        let pages = self.ledger.pages();
        if plan.page_count() as usize != pages.len() {
            return Err(BlattwerkError::validation(format!(
                "split plan covers {} pages but the document has {}",
                plan.page_count(),
                pages.len()
            )));
        }
        plan.groups()
            .into_iter()
            .enumerate()
            .map(|(part, group)| {
                let first = *group.start() as usize - 1;
                let last = *group.end() as usize;
                let part_pages: Vec<PageDescriptor> = pages[first..last]
                    .iter()
                    .enumerate()
                    .map(|(index, page)| PageDescriptor {
                        display_position: index + 1,
                        ..page.clone()
                    })
                    .collect();
                let part_overlays: Vec<PlacedOverlay> = self
                    .placement
                    .overlays()
                    .iter()
                    .filter(|overlay| (first..last).contains(&overlay.page_index))
                    .map(|overlay| PlacedOverlay {
                        page_index: overlay.page_index - first,
                        ..overlay.clone()
                    })
                    .collect();
                let AssembledPdf { bytes, report } =
                    self.assembler
                        .assemble(&self.sources, &part_pages, &part_overlays)?;
                Ok(ExportedFile {
                    file_name: self.output_name(OutputKind::SplitPart(part + 1)),
                    bytes,
                    report,
                })
            })
            .collect()
    }

    pub fn is_exporting(&self) -> bool {
        self.gate.is_busy()
    }

    fn export_job(&self) -> Result<ExportJob> {
        if self.sources.is_empty() {
            return Err(BlattwerkError::validation("Open a PDF first."));
        }
        debug!(
            pages = self.ledger.len(),
            reordered = self.ledger.is_reordered(),
            overlays = self.placement.overlays().len(),
            "export prepared"
        );
        Ok(ExportJob {
            assembler: self.assembler.clone(),
            sources: self.sources.clone(),
            pages: self.ledger.pages().to_vec(),
            overlays: self.placement.overlays().to_vec(),
            file_name: self.output_name(self.default_output_kind()),
        })
    }

    // -- Previews -------------------------------------------------------------

    pub fn previews(&self) -> Arc<PreviewScheduler> {
        Arc::clone(&self.previews)
    }

    /// Render a working page through `renderer` on a blocking worker. Returns
    /// `None` when a newer request for the same page (or a zoom change, or
    /// closing the session) made this result stale.
    pub async fn render_preview(
        &self,
        renderer: Arc<dyn PageRenderer>,
        page_index: usize,
        scale: f32,
    ) -> Result<Option<RgbaImage>> {
        let page = self
            .ledger
            .pages()
            .get(page_index)
            .cloned()
            .ok_or_else(|| BlattwerkError::validation(format!("page {} does not exist", page_index + 1)))?;
        let source = self
            .sources
            .get(page.source_document_index)
            .ok_or_else(|| BlattwerkError::validation("page refers to a closed document"))?;
        let stored = source
            .layout()
            .initial_rotations
            .get((page.original_page_number as usize).saturating_sub(1))
            .copied()
            .unwrap_or_default();
        let extra = extra_rotation(stored, page.rotation);

        let ticket = self.previews.request(page.id);
        let pdf = source.shared_bytes();
        let rendered = tokio::task::spawn_blocking(move || {
            renderer.render(&pdf, page.original_page_number, scale)
        })
        .await
        .map_err(|err| BlattwerkError::DocumentLoad(format!("preview worker failed: {err}")))??;

        if !self.previews.is_current(&ticket) {
            debug!(page_index, "stale preview discarded");
            return Ok(None);
        }
        Ok(Some(turn(rendered, extra)))
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Close the editor, dropping every document buffer and refusing any
    /// preview still in flight.
    pub fn close(mut self) {
        self.release();
        info!("session closed");
    }

    fn release(&mut self) {
        self.previews.close();
        self.signature.clear();
        self.sources.clear();
        self.sources.shrink_to_fit();
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        if !self.sources.is_empty() {
            debug!(sources = self.sources.len(), "releasing session buffers");
            self.release();
        }
    }
}

/// Rotation still to apply to a renderer's output, which already shows the
/// page's stored rotation.
fn extra_rotation(stored: Rotation, wanted: Rotation) -> Rotation {
    let delta = i64::from(wanted.degrees()) - i64::from(stored.degrees());
    Rotation::from_degrees(delta).unwrap_or_default()
}

fn turn(image: RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::Deg0 => image,
        Rotation::Deg90 => imageops::rotate90(&image),
        Rotation::Deg180 => imageops::rotate180(&image),
        Rotation::Deg270 => imageops::rotate270(&image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{SignatureMode, SignaturePad};
    use crate::source::fixtures::simple_pdf;
    use blattwerk_core::RotationDirection;
    use image::Rgba;

    fn session_with(pages: usize) -> EditSession {
        let mut session = EditSession::new(&AppConfig::default());
        session
            .load_documents(vec![("contract.pdf".into(), simple_pdf(pages))])
            .expect("load");
        session
    }

    fn ready_signature(session: &mut EditSession) {
        let flow = session.signature_mut();
        flow.configure(SignatureMode::Draw);
        let mut pad = SignaturePad::new(120, 60, 3.0);
        pad.pointer_down(5.0, 30.0);
        pad.pointer_move(115.0, 30.0);
        flow.use_drawing(&mut pad).expect("signature");
    }

    struct SolidRenderer;

    impl PageRenderer for SolidRenderer {
        fn render(&self, _pdf: &[u8], _page_number: u32, _scale: f32) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255])))
        }
    }

    #[test]
    fn overlays_follow_reordered_pages_and_die_with_deleted_ones() {
        let mut session = session_with(3);
        ready_signature(&mut session);
        let on_last = session
            .place_signature(2, PercentPoint::new(50.0, 50.0), None)
            .expect("placed");
        let on_first = session
            .place_signature(0, PercentPoint::new(50.0, 50.0), None)
            .expect("placed");

        let ids: Vec<PageId> = session.ledger().pages().iter().map(|p| p.id).collect();
        session.with_ledger(|ledger| ledger.reorder(ids[2], 1));
        assert_eq!(session.placement().get(on_last).expect("kept").page_index, 0);
        assert_eq!(session.placement().get(on_first).expect("kept").page_index, 1);

        session.with_ledger(|ledger| ledger.delete(&[ids[0]]));
        assert!(session.placement().get(on_first).is_none());
        assert_eq!(session.placement().get(on_last).expect("kept").page_index, 0);
    }

    #[test]
    fn placement_undo_after_page_delete_does_not_retarget() {
        let mut session = session_with(3);
        let first = session
            .mark_redaction(0, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0))
            .expect("marked");
        let ids: Vec<PageId> = session.ledger().pages().iter().map(|p| p.id).collect();
        session.with_ledger(|ledger| ledger.delete(&[ids[0]]));
        assert!(session.placement().get(first).is_none());

        // Undoing the mark must not resurrect it on whatever page is now first.
        session.placement_mut().undo();
        assert!(session.placement().get(first).is_none());
        let file = session.export().expect("export");
        assert_eq!(file.report.applied_overlays, 0);
        assert!(file.report.skipped_overlays.is_empty());
    }

    #[test]
    fn placement_undo_after_reorder_keeps_pages() {
        let mut session = session_with(3);
        let on_third = session
            .mark_redaction(2, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0))
            .expect("marked");
        let later = session
            .mark_redaction(1, PercentPoint::new(50.0, 50.0), PercentPoint::new(60.0, 60.0))
            .expect("marked");
        let ids: Vec<PageId> = session.ledger().pages().iter().map(|p| p.id).collect();
        session.with_ledger(|ledger| ledger.reorder(ids[2], 1));
        assert_eq!(session.placement().get(on_third).expect("kept").page_index, 0);

        session.placement_mut().undo();
        assert!(session.placement().get(later).is_none());
        let kept = session.placement().get(on_third).expect("kept");
        assert_eq!(session.ledger().pages()[kept.page_index].id, ids[2]);

        session.placement_mut().redo();
        let redone = session.placement().get(later).expect("redone");
        assert_eq!(session.ledger().pages()[redone.page_index].id, ids[1]);
    }

    #[test]
    fn rotation_only_edits_keep_overlays_in_place() {
        let mut session = session_with(2);
        let id = session
            .mark_redaction(1, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0))
            .expect("marked");
        session.with_ledger(|ledger| ledger.select_all());
        session.with_ledger(|ledger| ledger.rotate_selected(RotationDirection::Clockwise));
        assert_eq!(session.placement().get(id).expect("kept").page_index, 1);
        assert!(session.placement().can_undo());
    }

    #[test]
    fn marks_on_missing_pages_are_rejected() {
        let mut session = session_with(1);
        assert!(session
            .mark_redaction(4, PercentPoint::new(0.0, 0.0), PercentPoint::new(5.0, 5.0))
            .is_err());
        assert!(session
            .place_signature(0, PercentPoint::new(50.0, 50.0), None)
            .is_err());
    }

    #[test]
    fn output_kind_tracks_edits() {
        let mut session = session_with(2);
        assert_eq!(session.default_output_kind(), OutputKind::Organized);
        session.add_document("appendix.pdf", simple_pdf(1)).expect("add");
        assert_eq!(session.default_output_kind(), OutputKind::Merged);
        ready_signature(&mut session);
        session
            .place_signature(2, PercentPoint::new(50.0, 50.0), None)
            .expect("placed");
        assert_eq!(session.default_output_kind(), OutputKind::Signed);
        session
            .mark_redaction(0, PercentPoint::new(1.0, 1.0), PercentPoint::new(9.0, 9.0))
            .expect("marked");
        assert_eq!(session.default_output_kind(), OutputKind::Redacted);
        assert_eq!(session.output_name(OutputKind::Redacted), "contract_redacted.pdf");
    }

    #[test]
    fn failed_load_leaves_session_untouched() {
        let mut session = session_with(2);
        let result = session.load_documents(vec![
            ("ok.pdf".into(), simple_pdf(1)),
            ("bad.pdf".into(), b"nope".to_vec()),
        ]);
        assert!(matches!(result, Err(BlattwerkError::DocumentLoad(_))));
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(session.sources()[0].name(), "contract.pdf");
    }

    #[test]
    fn export_names_and_applies_overlays() {
        let mut session = session_with(2);
        ready_signature(&mut session);
        session
            .place_signature(1, PercentPoint::new(50.0, 80.0), None)
            .expect("placed");
        let file = session.export().expect("export");
        assert_eq!(file.file_name, "contract_signed.pdf");
        assert_eq!(file.report.page_count, 2);
        assert_eq!(file.report.applied_overlays, 1);
        assert!(!session.is_exporting());
    }

    #[test]
    fn export_is_refused_while_another_runs() {
        let session = session_with(1);
        let _held = session.gate.try_acquire().expect("permit");
        assert!(matches!(session.export(), Err(BlattwerkError::AssemblyInProgress)));
    }

    #[tokio::test]
    async fn async_export_releases_the_gate() {
        let session = session_with(2);
        let file = session.export_async().await.expect("export");
        assert_eq!(file.file_name, "contract_organized.pdf");
        assert!(!session.is_exporting());
        let _held = session.gate.try_acquire().expect("permit");
        assert!(matches!(
            session.export_async().await,
            Err(BlattwerkError::AssemblyInProgress)
        ));
    }

    #[test]
    fn split_parts_carry_their_overlays() {
        let mut session = session_with(4);
        session
            .mark_redaction(3, PercentPoint::new(10.0, 10.0), PercentPoint::new(30.0, 30.0))
            .expect("marked");
        let mut plan = SplitPlan::new(4);
        plan.add_cut(2);
        let parts = session.export_split(&plan).expect("split");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].file_name, "contract_part_1.pdf");
        assert_eq!(parts[0].report.applied_overlays, 0);
        assert_eq!(parts[1].report.applied_overlays, 1);
        assert!(session.export_split(&SplitPlan::new(3)).is_err());
    }

    #[tokio::test]
    async fn previews_are_turned_and_stale_ones_dropped() {
        let mut session = session_with(1);
        let id = session.ledger().pages()[0].id;
        session.with_ledger(|ledger| ledger.rotate(&[id], RotationDirection::Clockwise));

        let renderer: Arc<dyn PageRenderer> = Arc::new(SolidRenderer);
        let image = session
            .render_preview(Arc::clone(&renderer), 0, 1.0)
            .await
            .expect("render")
            .expect("current");
        assert_eq!(image.dimensions(), (2, 4));

        session.previews().close();
        let stale = session.render_preview(renderer, 0, 1.0).await.expect("render");
        assert!(stale.is_none());
    }

    #[test]
    fn close_refuses_late_previews() {
        let session = session_with(1);
        let previews = session.previews();
        let ticket = previews.request(session.ledger().pages()[0].id);
        session.close();
        assert!(!previews.is_current(&ticket));
    }

    #[test]
    fn extra_rotation_is_relative_to_stored() {
        assert_eq!(extra_rotation(Rotation::Deg90, Rotation::Deg0), Rotation::Deg270);
        assert_eq!(extra_rotation(Rotation::Deg90, Rotation::Deg180), Rotation::Deg90);
    }
}
