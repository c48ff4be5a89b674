// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature sources (freehand pad, rendered text, uploaded image) and the
// workflow that turns a configured signature into placements.

pub mod flow;
pub mod pad;
pub mod text;

pub use flow::{FlowState, SignatureFlow, SignatureMode};
pub use pad::SignaturePad;
pub use text::{TextSignatureStyle, parse_hex_color, render_text_signature};
