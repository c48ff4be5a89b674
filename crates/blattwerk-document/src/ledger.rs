// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page ledger — the working order, rotation, and selection of every page of
// one or more loaded documents. It is the single source of truth for what
// the assembled output will contain.
//
// Operations on unknown page ids are no-ops: rapid UI events can race ahead
// of state updates, and a stale id must never corrupt the ledger.

use std::collections::HashSet;

use blattwerk_core::{PageId, Rotation, RotationDirection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::history::EditHistory;

/// One page of the working document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub id: PageId,
    /// Index of the loaded document this page came from.
    pub source_document_index: usize,
    /// 1-indexed page number inside its source document.
    pub original_page_number: u32,
    /// 1-indexed position in the working order.
    pub display_position: usize,
    /// Absolute rotation the page will carry in the output.
    pub rotation: Rotation,
    pub selected: bool,
}

/// What the ledger needs to know about a loaded document: its pages'
/// existing rotations, in page order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLayout {
    pub initial_rotations: Vec<Rotation>,
}

impl DocumentLayout {
    /// A document of `page_count` unrotated pages.
    pub fn upright(page_count: usize) -> Self {
        Self {
            initial_rotations: vec![Rotation::Deg0; page_count],
        }
    }

    pub fn page_count(&self) -> usize {
        self.initial_rotations.len()
    }
}

/// Move the item at `from` to `to` (both 0-indexed), returning a new list.
///
/// `to` is clamped to the list; an out-of-range `from` returns the list
/// unchanged. Cheap enough to call on every drag-over event.
pub fn reordered<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() {
        return out;
    }
    let item = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, item);
    out
}

#[derive(Debug, Clone)]
struct DragState {
    page_id: PageId,
}

/// Ordered, mutable record of the output's pages.
#[derive(Debug, Clone)]
pub struct PageLedger {
    pages: Vec<PageDescriptor>,
    /// Page count right after loading, before any deletion.
    loaded_count: usize,
    /// Number of source documents ever loaded into this ledger.
    document_count: usize,
    history: EditHistory<Vec<PageDescriptor>>,
    drag: Option<DragState>,
}

impl PageLedger {
    /// An empty ledger keeping up to `history_limit` undo snapshots.
    pub fn new(history_limit: usize) -> Self {
        Self {
            pages: Vec::new(),
            loaded_count: 0,
            document_count: 0,
            history: EditHistory::new(Vec::new(), history_limit),
            drag: None,
        }
    }

    // -- Loading --------------------------------------------------------------

    /// Replace the ledger with one descriptor per page across `documents`,
    /// in input order. History restarts from the loaded state.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn load(&mut self, documents: &[DocumentLayout]) {
        self.pages = documents
            .iter()
            .enumerate()
            .flat_map(|(doc_index, layout)| {
                layout
                    .initial_rotations
                    .iter()
                    .enumerate()
                    .map(move |(page_index, rotation)| PageDescriptor {
                        id: PageId::new(),
                        source_document_index: doc_index,
                        original_page_number: page_index as u32 + 1,
                        display_position: 0,
                        rotation: *rotation,
                        selected: false,
                    })
            })
            .collect();
        self.renumber();
        self.loaded_count = self.pages.len();
        self.document_count = documents.len();
        self.drag = None;
        self.history.reset(self.pages.clone());
        info!(pages = self.pages.len(), "page ledger loaded");
    }

    /// Append another document's pages after the current ones, as one
    /// undoable step. Returns the new document's index; indices are never
    /// reused, even if the append is undone.
    #[instrument(skip_all, fields(pages = layout.page_count()))]
    pub fn append_document(&mut self, layout: &DocumentLayout) -> usize {
        let doc_index = self.document_count;
        self.pages
            .extend(layout.initial_rotations.iter().enumerate().map(|(page_index, rotation)| {
                PageDescriptor {
                    id: PageId::new(),
                    source_document_index: doc_index,
                    original_page_number: page_index as u32 + 1,
                    display_position: 0,
                    rotation: *rotation,
                    selected: false,
                }
            }));
        self.renumber();
        self.loaded_count += layout.page_count();
        self.document_count = doc_index + 1;
        self.commit();
        info!(doc_index, pages = self.pages.len(), "document appended");
        doc_index
    }

    // -- Queries --------------------------------------------------------------

    /// Current snapshot in display order.
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: PageId) -> Option<&PageDescriptor> {
        self.pages.iter().find(|page| page.id == id)
    }

    /// 0-indexed position of a page in the working order.
    pub fn index_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|page| page.id == id)
    }

    pub fn selected_ids(&self) -> Vec<PageId> {
        self.pages
            .iter()
            .filter(|page| page.selected)
            .map(|page| page.id)
            .collect()
    }

    /// Whether the output would differ in page order or count from the
    /// concatenation of the loaded documents.
    pub fn is_reordered(&self) -> bool {
        if self.pages.len() != self.loaded_count {
            return true;
        }
        let mut expected = (0usize, 0u32);
        for page in &self.pages {
            let next_in_doc = (expected.0, expected.1 + 1);
            let next_doc = (expected.0 + 1, 1);
            let here = (page.source_document_index, page.original_page_number);
            if here != next_in_doc && here != next_doc {
                return true;
            }
            expected = here;
        }
        false
    }

    // -- Mutations ------------------------------------------------------------

    /// Move a page to `new_position` (1-indexed, clamped to the ledger).
    /// Returns whether anything changed.
    #[instrument(skip(self))]
    pub fn reorder(&mut self, page_id: PageId, new_position: usize) -> bool {
        let Some(from) = self.index_of(page_id) else {
            debug!("reorder of unknown page ignored");
            return false;
        };
        let to = new_position.clamp(1, self.pages.len()) - 1;
        if from == to {
            return false;
        }
        self.pages = reordered(&self.pages, from, to);
        self.renumber();
        self.commit();
        true
    }

    /// Turn each listed page a quarter turn. Unknown ids are skipped.
    #[instrument(skip(self, page_ids), fields(count = page_ids.len()))]
    pub fn rotate(&mut self, page_ids: &[PageId], direction: RotationDirection) -> bool {
        let targets: HashSet<PageId> = page_ids.iter().copied().collect();
        let mut changed = false;
        for page in self.pages.iter_mut().filter(|page| targets.contains(&page.id)) {
            page.rotation = page.rotation.turned(direction);
            changed = true;
        }
        if changed {
            self.commit();
        }
        changed
    }

    pub fn rotate_selected(&mut self, direction: RotationDirection) -> bool {
        let ids = self.selected_ids();
        self.rotate(&ids, direction)
    }

    /// Remove the listed pages and renumber the rest. Returns the ids that
    /// were actually removed.
    #[instrument(skip(self, page_ids), fields(count = page_ids.len()))]
    pub fn delete(&mut self, page_ids: &[PageId]) -> Vec<PageId> {
        let targets: HashSet<PageId> = page_ids.iter().copied().collect();
        let removed: Vec<PageId> = self
            .pages
            .iter()
            .filter(|page| targets.contains(&page.id))
            .map(|page| page.id)
            .collect();
        if removed.is_empty() {
            return removed;
        }
        self.pages.retain(|page| !targets.contains(&page.id));
        if self
            .drag
            .as_ref()
            .is_some_and(|drag| targets.contains(&drag.page_id))
        {
            self.drag = None;
        }
        self.renumber();
        self.commit();
        info!(removed = removed.len(), remaining = self.pages.len(), "pages deleted");
        removed
    }

    pub fn delete_selected(&mut self) -> Vec<PageId> {
        let ids = self.selected_ids();
        self.delete(&ids)
    }

    // -- Selection (not recorded in history) ----------------------------------

    pub fn toggle_select(&mut self, page_id: PageId) {
        if let Some(page) = self.pages.iter_mut().find(|page| page.id == page_id) {
            page.selected = !page.selected;
        }
    }

    pub fn select_all(&mut self) {
        self.pages.iter_mut().for_each(|page| page.selected = true);
    }

    pub fn deselect_all(&mut self) {
        self.pages.iter_mut().for_each(|page| page.selected = false);
    }

    // -- Drag reorder ---------------------------------------------------------

    /// Start dragging a page. Fails if another drag is active or the page is
    /// unknown.
    pub fn begin_drag(&mut self, page_id: PageId) -> bool {
        if self.drag.is_some() {
            return false;
        }
        if self.index_of(page_id).is_none() {
            return false;
        }
        self.drag = Some(DragState { page_id });
        true
    }

    /// Order the ledger would have if the dragged page were dropped at
    /// `position` (1-indexed). Does not mutate; safe to call per move event.
    pub fn drag_preview(&self, position: usize) -> Vec<PageDescriptor> {
        let Some(from) = self.drag.as_ref().and_then(|drag| self.index_of(drag.page_id)) else {
            return self.pages.clone();
        };
        let to = position.clamp(1, self.pages.len()) - 1;
        let mut preview = reordered(&self.pages, from, to);
        renumber(&mut preview);
        preview
    }

    /// Commit the drag at `position`; one history entry per gesture.
    pub fn drop_drag(&mut self, position: usize) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        self.reorder(drag.page_id, position)
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // -- History --------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let restored = self.history.undo().cloned();
        self.restore(restored)
    }

    pub fn redo(&mut self) -> bool {
        let restored = self.history.redo().cloned();
        self.restore(restored)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -- Internals ------------------------------------------------------------

    fn restore(&mut self, snapshot: Option<Vec<PageDescriptor>>) -> bool {
        let Some(mut snapshot) = snapshot else {
            return false;
        };
        // Selection is live UI state, not part of the edit being undone.
        let selected: HashSet<PageId> = self.selected_ids().into_iter().collect();
        for page in &mut snapshot {
            page.selected = selected.contains(&page.id);
        }
        self.pages = snapshot;
        self.drag = None;
        true
    }

    fn renumber(&mut self) {
        renumber(&mut self.pages);
    }

    fn commit(&mut self) {
        self.history.record(self.pages.clone());
    }
}

fn renumber(pages: &mut [PageDescriptor]) {
    for (index, page) in pages.iter_mut().enumerate() {
        page.display_position = index + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_pages() -> PageLedger {
        let mut ledger = PageLedger::new(50);
        ledger.load(&[DocumentLayout::upright(3)]);
        ledger
    }

    fn originals(ledger: &PageLedger) -> Vec<u32> {
        ledger.pages().iter().map(|p| p.original_page_number).collect()
    }

    fn positions(ledger: &PageLedger) -> Vec<usize> {
        ledger.pages().iter().map(|p| p.display_position).collect()
    }

    #[test]
    fn load_spans_documents_in_order() {
        let mut ledger = PageLedger::new(10);
        ledger.load(&[DocumentLayout::upright(2), DocumentLayout::upright(3)]);
        assert_eq!(ledger.len(), 5);
        assert_eq!(positions(&ledger), vec![1, 2, 3, 4, 5]);
        assert_eq!(ledger.pages()[2].source_document_index, 1);
        assert_eq!(ledger.pages()[2].original_page_number, 1);
        assert!(!ledger.is_reordered());
    }

    #[test]
    fn move_last_page_to_front() {
        let mut ledger = three_pages();
        let third = ledger.pages()[2].id;
        assert!(ledger.reorder(third, 1));
        assert_eq!(originals(&ledger), vec![3, 1, 2]);
        assert_eq!(positions(&ledger), vec![1, 2, 3]);
        assert!(ledger.is_reordered());
    }

    #[test]
    fn reorder_clamps_position_and_ignores_unknown_ids() {
        let mut ledger = three_pages();
        let first = ledger.pages()[0].id;
        assert!(ledger.reorder(first, 99));
        assert_eq!(originals(&ledger), vec![2, 3, 1]);
        assert!(!ledger.reorder(PageId::new(), 1));
        assert_eq!(originals(&ledger), vec![2, 3, 1]);
    }

    #[test]
    fn rotation_accumulates_and_wraps() {
        let mut ledger = three_pages();
        let id = ledger.pages()[0].id;
        ledger.rotate(&[id], RotationDirection::CounterClockwise);
        assert_eq!(ledger.pages()[0].rotation, Rotation::Deg270);
        for _ in 0..4 {
            ledger.rotate(&[id], RotationDirection::Clockwise);
        }
        assert_eq!(ledger.pages()[0].rotation, Rotation::Deg270);
    }

    #[test]
    fn delete_renumbers_without_touching_origins() {
        let mut ledger = three_pages();
        let middle = ledger.pages()[1].id;
        assert_eq!(ledger.delete(&[middle]), vec![middle]);
        assert_eq!(originals(&ledger), vec![1, 3]);
        assert_eq!(positions(&ledger), vec![1, 2]);
        assert!(ledger.get(middle).is_none());
        assert!(ledger.is_reordered());
    }

    #[test]
    fn bulk_operations_use_selection() {
        let mut ledger = three_pages();
        ledger.select_all();
        let first = ledger.pages()[0].id;
        ledger.toggle_select(first);
        ledger.rotate_selected(RotationDirection::Clockwise);
        let rotations: Vec<_> = ledger.pages().iter().map(|p| p.rotation).collect();
        assert_eq!(rotations, vec![Rotation::Deg0, Rotation::Deg90, Rotation::Deg90]);
        assert_eq!(ledger.delete_selected().len(), 2);
        assert_eq!(originals(&ledger), vec![1]);
    }

    #[test]
    fn drag_preview_is_pure_and_drop_commits_once() {
        let mut ledger = three_pages();
        let first = ledger.pages()[0].id;
        assert!(ledger.begin_drag(first));
        assert!(!ledger.begin_drag(first));
        for position in [2, 3, 2, 3] {
            let preview = ledger.drag_preview(position);
            assert_eq!(preview.len(), 3);
        }
        assert_eq!(originals(&ledger), vec![1, 2, 3]);
        assert!(ledger.drop_drag(3));
        assert_eq!(originals(&ledger), vec![2, 3, 1]);
        assert!(ledger.undo());
        assert_eq!(originals(&ledger), vec![1, 2, 3]);
        assert!(!ledger.can_undo());
    }

    #[test]
    fn undo_keeps_current_selection() {
        let mut ledger = three_pages();
        let id = ledger.pages()[1].id;
        ledger.rotate(&[id], RotationDirection::Clockwise);
        ledger.toggle_select(id);
        assert!(ledger.undo());
        assert_eq!(ledger.pages()[1].rotation, Rotation::Deg0);
        assert!(ledger.pages()[1].selected);
        assert!(ledger.redo());
        assert_eq!(ledger.pages()[1].rotation, Rotation::Deg90);
    }

    #[test]
    fn appended_document_gets_next_index_and_is_undoable() {
        let mut ledger = three_pages();
        assert_eq!(ledger.append_document(&DocumentLayout::upright(2)), 1);
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.pages()[3].source_document_index, 1);
        assert_eq!(ledger.pages()[4].original_page_number, 2);
        assert!(!ledger.is_reordered());
        assert!(ledger.undo());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn reordered_handles_edges() {
        assert_eq!(reordered(&[1, 2, 3], 0, 2), vec![2, 3, 1]);
        assert_eq!(reordered(&[1, 2, 3], 2, 0), vec![3, 1, 2]);
        assert_eq!(reordered(&[1, 2, 3], 7, 0), vec![1, 2, 3]);
        assert_eq!(reordered(&[1, 2, 3], 1, 50), vec![1, 3, 2]);
    }
}
