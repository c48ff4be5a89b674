// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background job bookkeeping for an editing session.
//
// - AssemblyGate: at most one export in flight; the permit frees the gate
//   when dropped, whichever way the export ends.
// - PreviewScheduler: every render request gets a ticket; only the newest
//   ticket per page may deliver its image.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use blattwerk_core::error::Result;
use blattwerk_core::{BlattwerkError, PageId};
use image::RgbaImage;
use tracing::debug;

/// Renders one page of a PDF to pixels. Supplied by the embedding
/// application; `page_number` is 1-indexed, `scale` is pixels per point.
pub trait PageRenderer: Send + Sync {
    fn render(&self, pdf: &[u8], page_number: u32, scale: f32) -> Result<RgbaImage>;
}

/// Single-slot lock for the export action.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGate {
    busy: Arc<AtomicBool>,
}

impl AssemblyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or fail with [`BlattwerkError::AssemblyInProgress`].
    pub fn try_acquire(&self) -> Result<AssemblyPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BlattwerkError::AssemblyInProgress)?;
        debug!("assembly gate acquired");
        Ok(AssemblyPermit {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one export.
#[derive(Debug)]
pub struct AssemblyPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for AssemblyPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        debug!("assembly gate released");
    }
}

/// Identifies one preview request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket {
    pub page_id: PageId,
    generation: u64,
}

/// Tracks the newest preview request per page so late results for an older
/// view state can be dropped.
#[derive(Debug, Default)]
pub struct PreviewScheduler {
    latest: Mutex<HashMap<PageId, u64>>,
    counter: AtomicU64,
    closed: AtomicBool,
}

impl PreviewScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `page_id`, superseding any earlier one.
    pub fn request(&self, page_id: PageId) -> PreviewTicket {
        let generation = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(page_id, generation);
        }
        PreviewTicket {
            page_id,
            generation,
        }
    }

    /// Whether a finished render may still be shown.
    pub fn is_current(&self, ticket: &PreviewTicket) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.latest
            .lock()
            .map(|latest| latest.get(&ticket.page_id) == Some(&ticket.generation))
            .unwrap_or(false)
    }

    /// Discard every outstanding request (zoom change, scroll jump).
    pub fn invalidate_all(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            let dropped = latest.len();
            latest.clear();
            debug!(dropped, "preview requests invalidated");
        }
    }

    /// Refuse all further results; used when the session closes.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.invalidate_all();
    }

    /// Number of pages with a request in flight or answered.
    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.latest.lock().map(|latest| latest.len()).unwrap_or(0)
    }
}
