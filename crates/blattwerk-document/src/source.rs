// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loaded source documents. The original bytes are kept read-only next to the
// parsed document; every export works on a copy.

use std::sync::Arc;

use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;
use blattwerk_core::{PageViewport, Rotation};
use lopdf::Document;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use crate::assembler::pages::{page_box, page_rotation};
use crate::geometry::PageBox;
use crate::ledger::DocumentLayout;

/// A parsed, immutable input PDF.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
    document: Arc<Document>,
    fingerprint: String,
    rotations: Vec<Rotation>,
    boxes: Vec<PageBox>,
}

impl SourceDocument {
    /// Parse `bytes` as a PDF. Encrypted and page-less files are refused
    /// with [`BlattwerkError::DocumentLoad`].
    #[instrument(skip(bytes))]
    pub fn load(name: &str, bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let document = Document::load_mem(&bytes)
            .map_err(|err| BlattwerkError::DocumentLoad(format!("{name}: {err}")))?;
        if document.is_encrypted() {
            return Err(BlattwerkError::DocumentLoad(format!(
                "{name} is password protected"
            )));
        }

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(BlattwerkError::DocumentLoad(format!("{name} has no pages")));
        }
        let rotations = pages.values().map(|id| page_rotation(&document, *id)).collect();
        let boxes = pages.values().map(|id| page_box(&document, *id)).collect();
        let fingerprint = fingerprint(&bytes);

        info!(name, pages = pages.len(), %fingerprint, "source document loaded");
        Ok(Self {
            name: name.to_string(),
            bytes,
            document: Arc::new(document),
            fingerprint,
            rotations,
            boxes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The untouched input buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the input buffer, for background work.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Hex SHA-256 of the input bytes.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn page_count(&self) -> usize {
        self.rotations.len()
    }

    /// Existing rotation of each page, as the ledger should start from.
    pub fn layout(&self) -> DocumentLayout {
        DocumentLayout {
            initial_rotations: self.rotations.clone(),
        }
    }

    /// Visible box of a 1-indexed page, in points.
    pub fn page_box(&self, page_number: u32) -> Option<PageBox> {
        let index = usize::try_from(page_number).ok()?.checked_sub(1)?;
        self.boxes.get(index).copied()
    }

    /// Shape of the page as displayed with `rotation`, at one pixel per
    /// point. Useful for placement before any preview has been rendered.
    pub fn displayed_viewport(&self, page_number: u32, rotation: Rotation) -> Option<PageViewport> {
        let page = self.page_box(page_number)?;
        Some(if rotation.is_sideways() {
            PageViewport::new(page.height, page.width)
        } else {
            PageViewport::new(page.width, page.height)
        })
    }
}

/// Hex-encoded SHA-256 digest.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
