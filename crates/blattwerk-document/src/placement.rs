// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement engine — signatures and redaction marks anchored to pages, with
// drag gestures and linear undo/redo.
//
// Page indices are 0-indexed positions in the working (output) page order for
// every overlay kind. Geometry is stored as page percentages, so placements
// stay valid when the preview is zoomed.

use blattwerk_core::{AppConfig, OverlayId, PageViewport, RedactionArea};
use tracing::{debug, info, instrument};

use crate::geometry::{
    self, Corner, MIN_OVERLAY_PERCENT, PercentPoint, PercentRect, height_for_width,
    width_for_height,
};
use crate::history::EditHistory;
use crate::raster::ImageRef;

/// What an overlay draws.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    /// An image, aspect-locked to its pixel size.
    Signature { image: ImageRef },
    /// An opaque mask.
    Redaction,
}

/// A rectangle anchored to one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOverlay {
    pub id: OverlayId,
    /// 0-indexed page in the working order.
    pub page_index: usize,
    pub rect: PercentRect,
    pub kind: OverlayKind,
}

impl PlacedOverlay {
    /// Pixel aspect ratio for signatures; `None` for free-form marks.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match &self.kind {
            OverlayKind::Signature { image } => Some(image.aspect_ratio()),
            OverlayKind::Redaction => None,
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self.kind, OverlayKind::Signature { .. })
    }
}

/// Tunables taken from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSettings {
    pub default_width_percent: f64,
    pub min_size_percent: f64,
    pub history_limit: usize,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            default_width_percent: 15.0,
            min_size_percent: MIN_OVERLAY_PERCENT,
            history_limit: 100,
        }
    }
}

impl From<&AppConfig> for PlacementSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_width_percent: config.default_signature_width_percent,
            min_size_percent: config.min_overlay_percent,
            history_limit: config.history_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureKind {
    Resize(Corner),
    Move,
}

/// The single in-flight drag. Deltas are measured from the pointer-down
/// position, so replaying a move event is idempotent.
#[derive(Debug, Clone, Copy)]
struct Gesture {
    overlay_id: OverlayId,
    kind: GestureKind,
    start: PercentRect,
    viewport: PageViewport,
}

/// Owns the overlay set and its history.
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    overlays: Vec<PlacedOverlay>,
    history: EditHistory<Vec<PlacedOverlay>>,
    gesture: Option<Gesture>,
    settings: PlacementSettings,
}

impl PlacementEngine {
    pub fn new(settings: PlacementSettings) -> Self {
        Self {
            overlays: Vec::new(),
            history: EditHistory::new(Vec::new(), settings.history_limit),
            gesture: None,
            settings,
        }
    }

    // -- Queries --------------------------------------------------------------

    /// Current overlay set, in placement order.
    pub fn overlays(&self) -> &[PlacedOverlay] {
        &self.overlays
    }

    pub fn get(&self, id: OverlayId) -> Option<&PlacedOverlay> {
        self.overlays.iter().find(|overlay| overlay.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Redaction marks in the shape the remote redaction tool expects.
    pub fn redaction_areas(&self) -> Vec<RedactionArea> {
        self.overlays
            .iter()
            .filter(|overlay| !overlay.is_signature())
            .map(|overlay| RedactionArea {
                page: overlay.page_index,
                x: overlay.rect.x,
                y: overlay.rect.y,
                width: overlay.rect.width,
                height: overlay.rect.height,
            })
            .collect()
    }

    pub fn settings(&self) -> &PlacementSettings {
        &self.settings
    }

    // -- Creation / removal ---------------------------------------------------

    /// Place a signature centred on `center`, at the default width with the
    /// height derived from the image and page aspect. Records one snapshot.
    #[instrument(skip(self, image))]
    pub fn place(
        &mut self,
        page_index: usize,
        center: PercentPoint,
        image: ImageRef,
        viewport: PageViewport,
    ) -> OverlayId {
        let rect = self.initial_signature_rect(center, image.aspect_ratio(), viewport);
        let id = OverlayId::new();
        self.overlays.push(PlacedOverlay {
            id,
            page_index,
            rect,
            kind: OverlayKind::Signature { image },
        });
        self.commit();
        info!(%id, page_index, ?rect, "signature placed");
        id
    }

    /// Mark a redaction spanning two pointer positions. Records one snapshot.
    #[instrument(skip(self))]
    pub fn mark_redaction(
        &mut self,
        page_index: usize,
        start: PercentPoint,
        end: PercentPoint,
    ) -> OverlayId {
        let rect = PercentRect::from_corners(start, end, self.settings.min_size_percent);
        let id = OverlayId::new();
        self.overlays.push(PlacedOverlay {
            id,
            page_index,
            rect,
            kind: OverlayKind::Redaction,
        });
        self.commit();
        info!(%id, page_index, ?rect, "redaction marked");
        id
    }

    /// Delete an overlay. Unknown ids are ignored.
    pub fn remove(&mut self, id: OverlayId) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|overlay| overlay.id != id);
        if self.overlays.len() == before {
            return false;
        }
        if self.gesture.is_some_and(|gesture| gesture.overlay_id == id) {
            self.gesture = None;
        }
        self.commit();
        debug!(%id, "overlay removed");
        true
    }

    /// Remove every overlay (one snapshot, undoable).
    pub fn clear(&mut self) {
        if self.overlays.is_empty() {
            return;
        }
        self.overlays.clear();
        self.gesture = None;
        self.commit();
    }

    /// Re-anchor overlays after the page order changed. `map` turns an old
    /// page index into the new one, or `None` when the page was deleted (its
    /// overlays are dropped). Every history snapshot is re-anchored the same
    /// way, so undo and redo never bring back an index from an older page
    /// order. Returns the number of current overlays dropped.
    pub fn remap_pages(&mut self, map: impl Fn(usize) -> Option<usize>) -> usize {
        let reanchor = |overlays: &mut Vec<PlacedOverlay>| {
            overlays.retain_mut(|overlay| match map(overlay.page_index) {
                Some(page_index) => {
                    overlay.page_index = page_index;
                    true
                }
                None => false,
            });
        };
        let before = self.overlays.len();
        reanchor(&mut self.overlays);
        self.history.rewrite(&reanchor);

        let dropped = before - self.overlays.len();
        let gesture_lost = self
            .gesture
            .is_some_and(|gesture| self.get(gesture.overlay_id).is_none());
        if gesture_lost {
            self.gesture = None;
        }
        if dropped > 0 {
            debug!(dropped, "overlays re-anchored");
        }
        dropped
    }

    // -- Gestures -------------------------------------------------------------

    /// Live corner resize. `dx`/`dy` are the pointer's total movement since
    /// pointer-down, in page percent. The first call starts the gesture;
    /// calls for a different overlay while one is active are ignored.
    pub fn resize(
        &mut self,
        id: OverlayId,
        corner: Corner,
        dx: f64,
        dy: f64,
        viewport: PageViewport,
    ) -> bool {
        if !self.ensure_gesture(id, GestureKind::Resize(corner), viewport) {
            return false;
        }
        let min = self.settings.min_size_percent;
        let Some(gesture) = self.gesture else {
            return false;
        };
        let Some(overlay) = self.overlays.iter_mut().find(|overlay| overlay.id == id) else {
            return false;
        };
        overlay.rect = match overlay.aspect_ratio() {
            Some(aspect) => geometry::resize_with_aspect(
                &gesture.start,
                corner,
                dx,
                dy,
                aspect,
                gesture.viewport,
                min,
            ),
            None => geometry::resize_free(&gesture.start, corner, dx, dy, min),
        };
        true
    }

    /// Live drag of a whole overlay; same delta convention as [`Self::resize`].
    pub fn move_by(&mut self, id: OverlayId, dx: f64, dy: f64) -> bool {
        let viewport = self.gesture.map_or(PageViewport::new(1.0, 1.0), |g| g.viewport);
        if !self.ensure_gesture(id, GestureKind::Move, viewport) {
            return false;
        }
        let Some(gesture) = self.gesture else {
            return false;
        };
        let Some(overlay) = self.overlays.iter_mut().find(|overlay| overlay.id == id) else {
            return false;
        };
        overlay.rect = gesture.start.translated(dx, dy);
        true
    }

    /// Pointer-up: keep the result and record one snapshot if the overlay
    /// actually changed.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        let changed = self
            .get(gesture.overlay_id)
            .is_some_and(|overlay| overlay.rect != gesture.start);
        if changed {
            self.commit();
        }
        changed
    }

    /// Abort the drag, restoring the rectangle it started from.
    pub fn cancel_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if let Some(overlay) = self
            .overlays
            .iter_mut()
            .find(|overlay| overlay.id == gesture.overlay_id)
        {
            overlay.rect = gesture.start;
        }
    }

    pub fn has_active_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    // -- History --------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.undo() {
            Some(snapshot) => {
                self.overlays = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.redo() {
            Some(snapshot) => {
                self.overlays = snapshot.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -- Internals ------------------------------------------------------------

    fn ensure_gesture(&mut self, id: OverlayId, kind: GestureKind, viewport: PageViewport) -> bool {
        match self.gesture {
            Some(gesture) => gesture.overlay_id == id && gesture.kind == kind,
            None => match self.get(id) {
                Some(overlay) => {
                    self.gesture = Some(Gesture {
                        overlay_id: id,
                        kind,
                        start: overlay.rect,
                        viewport,
                    });
                    true
                }
                None => false,
            },
        }
    }

    fn initial_signature_rect(
        &self,
        center: PercentPoint,
        aspect_ratio: f64,
        viewport: PageViewport,
    ) -> PercentRect {
        let min = self.settings.min_size_percent;
        let mut width = self.settings.default_width_percent.max(min).min(100.0);
        let mut height = height_for_width(width, aspect_ratio, viewport);
        // Very tall images: fit the height to the page instead.
        if height > 100.0 {
            height = 100.0;
            width = width_for_height(height, aspect_ratio, viewport);
        }
        // Very flat images: grow until both sides clear the floor, without
        // leaving the page.
        let grow = (min / width).max(min / height);
        if grow > 1.0 {
            let cap = (100.0 / width).min(100.0 / height);
            let factor = grow.min(cap);
            width *= factor;
            height *= factor;
        }
        PercentRect::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
        .translated(0.0, 0.0)
    }

    fn commit(&mut self) {
        self.history.record(self.overlays.clone());
    }
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(PlacementSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn signature(width: u32, height: u32) -> ImageRef {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])));
        ImageRef::from_dynamic(&img).expect("encode")
    }

    fn portrait() -> PageViewport {
        PageViewport::new(600.0, 800.0)
    }

    #[test]
    fn placing_a_wide_signature_uses_default_width() {
        let mut engine = PlacementEngine::default();
        let id = engine.place(0, PercentPoint::new(50.0, 50.0), signature(200, 100), portrait());
        let rect = engine.get(id).expect("placed").rect;
        assert!((rect.width - 15.0).abs() < 1e-9);
        assert!((rect.height - 5.625).abs() < 1e-9);
        assert!((rect.x - 42.5).abs() < 1e-9);
        assert!(rect.is_on_page());
    }

    #[test]
    fn placing_near_an_edge_stays_on_page() {
        let mut engine = PlacementEngine::default();
        let id = engine.place(0, PercentPoint::new(99.0, 0.5), signature(200, 100), portrait());
        let rect = engine.get(id).expect("placed").rect;
        assert!(rect.is_on_page());
        assert!((rect.right() - 100.0).abs() < 1e-9);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn tall_image_is_fitted_to_page_height() {
        let mut engine = PlacementEngine::default();
        let id = engine.place(0, PercentPoint::new(50.0, 50.0), signature(10, 400), portrait());
        let rect = engine.get(id).expect("placed").rect;
        assert!(rect.is_on_page());
        assert!(rect.height <= 100.0);
    }

    #[test]
    fn undo_redo_across_placements() {
        let mut engine = PlacementEngine::default();
        let sig = signature(200, 100);
        engine.place(0, PercentPoint::new(20.0, 20.0), sig.clone(), portrait());
        engine.place(1, PercentPoint::new(40.0, 40.0), sig.clone(), portrait());
        let after_two = engine.overlays().to_vec();

        assert!(engine.undo());
        assert_eq!(engine.overlays().len(), 1);
        assert!(engine.redo());
        assert_eq!(engine.overlays(), after_two.as_slice());

        engine.undo();
        engine.place(2, PercentPoint::new(60.0, 60.0), sig, portrait());
        assert!(!engine.can_redo());
        assert_eq!(engine.overlays().len(), 2);
    }

    #[test]
    fn undo_at_start_is_a_no_op() {
        let mut engine = PlacementEngine::default();
        assert!(!engine.undo());
        assert!(!engine.redo());
    }

    #[test]
    fn resize_gesture_commits_once() {
        let mut engine = PlacementEngine::default();
        let id = engine.place(0, PercentPoint::new(50.0, 50.0), signature(200, 100), portrait());
        for step in 1..=10 {
            assert!(engine.resize(id, Corner::BottomRight, step as f64, 0.0, portrait()));
        }
        assert!(engine.end_gesture());
        let grown = engine.get(id).expect("present").rect;
        assert!((grown.width - 25.0).abs() < 1e-9);

        // One undo returns to the placed size, a second removes the placement.
        assert!(engine.undo());
        assert!((engine.get(id).expect("present").rect.width - 15.0).abs() < 1e-9);
        assert!(engine.undo());
        assert!(engine.is_empty());
    }

    #[test]
    fn only_one_gesture_at_a_time() {
        let mut engine = PlacementEngine::default();
        let a = engine.mark_redaction(0, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0));
        let b = engine.mark_redaction(0, PercentPoint::new(50.0, 50.0), PercentPoint::new(60.0, 60.0));
        assert!(engine.move_by(a, 5.0, 5.0));
        assert!(!engine.move_by(b, 5.0, 5.0));
        assert!(!engine.resize(a, Corner::TopLeft, 1.0, 1.0, portrait()));
        engine.cancel_gesture();
        assert_eq!(engine.get(a).expect("a").rect, PercentRect::new(10.0, 10.0, 10.0, 10.0));
        assert!(!engine.end_gesture());
    }

    #[test]
    fn redaction_resize_is_free_form_and_clamped() {
        let mut engine = PlacementEngine::default();
        let id = engine.mark_redaction(0, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0));
        engine.resize(id, Corner::BottomRight, 1000.0, -1000.0, portrait());
        engine.end_gesture();
        let rect = engine.get(id).expect("present").rect;
        assert!(rect.is_on_page());
        assert!((rect.right() - 100.0).abs() < 1e-9);
        assert!((rect.height - MIN_OVERLAY_PERCENT).abs() < 1e-9);
    }

    #[test]
    fn redaction_areas_skip_signatures() {
        let mut engine = PlacementEngine::default();
        engine.place(0, PercentPoint::new(50.0, 50.0), signature(200, 100), portrait());
        engine.mark_redaction(3, PercentPoint::new(30.0, 40.0), PercentPoint::new(10.0, 20.0));
        let areas = engine.redaction_areas();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].page, 3);
        assert_eq!((areas[0].x, areas[0].y), (10.0, 20.0));
        assert_eq!((areas[0].width, areas[0].height), (20.0, 20.0));
    }

    #[test]
    fn remap_drops_overlays_of_deleted_pages() {
        let mut engine = PlacementEngine::default();
        let sig = signature(200, 100);
        engine.place(0, PercentPoint::new(50.0, 50.0), sig.clone(), portrait());
        let kept = engine.place(2, PercentPoint::new(50.0, 50.0), sig, portrait());
        // Page 0 deleted; page 2 moves up to index 1.
        let dropped = engine.remap_pages(|old| match old {
            0 => None,
            n => Some(n - 1),
        });
        assert_eq!(dropped, 1);
        assert_eq!(engine.overlays().len(), 1);
        assert_eq!(engine.get(kept).expect("kept").page_index, 1);

        // Undo takes back the last placement; the first one stays gone.
        assert!(engine.undo());
        assert!(engine.overlays().is_empty());
        assert!(engine.redo());
        assert_eq!(engine.get(kept).expect("redone").page_index, 1);
        assert_eq!(engine.overlays().len(), 1);
    }

    #[test]
    fn remap_reanchors_history_after_reorder() {
        let mut engine = PlacementEngine::default();
        let moved = engine.mark_redaction(2, PercentPoint::new(10.0, 10.0), PercentPoint::new(20.0, 20.0));
        let second = engine.mark_redaction(0, PercentPoint::new(30.0, 30.0), PercentPoint::new(40.0, 40.0));
        // Page 2 moved to the front: [2, 0, 1].
        let dropped = engine.remap_pages(|old| Some([1, 2, 0][old]));
        assert_eq!(dropped, 0);
        assert!(engine.undo());
        assert!(engine.get(second).is_none());
        assert_eq!(engine.get(moved).expect("first mark").page_index, 0);
        assert!(engine.redo());
        assert_eq!(engine.get(second).expect("redone").page_index, 1);
    }
}
