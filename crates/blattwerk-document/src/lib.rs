// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — the client-side page editor.
//
// Page ledger (order, rotation, deletion), overlay placement with undo/redo,
// signature sources (drawn, uploaded, typed), split planning, and the
// document assembler that writes the final PDF with lopdf. The editing
// session ties them together and gates exports and previews.

pub mod assembler;
pub mod geometry;
pub mod history;
pub mod ledger;
pub mod placement;
pub mod raster;
pub mod session;
pub mod signature;
pub mod source;
pub mod split;

// Re-export the primary structs so callers can use `blattwerk_document::PageLedger` etc.
pub use assembler::{AssembledPdf, AssemblyReport, DocumentAssembler};
pub use geometry::{Corner, PercentPoint, PercentRect, PixelBounds};
pub use ledger::{DocumentLayout, PageDescriptor, PageLedger};
pub use placement::{OverlayKind, PlacedOverlay, PlacementEngine, PlacementSettings};
pub use raster::ImageRef;
pub use session::{EditSession, ExportedFile, PageRenderer};
pub use signature::{SignatureFlow, SignatureMode, SignaturePad, TextSignatureStyle};
pub use source::SourceDocument;
pub use split::{SplitPlan, parse_page_ranges};
