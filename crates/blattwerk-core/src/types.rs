// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk page editor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a page in the working ledger.
///
/// Survives reordering and is never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a placed overlay (signature or redaction mark).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayId(pub Uuid);

impl OverlayId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Page rotation in quarter turns, clockwise, as stored in a PDF `/Rotate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees, one of 0, 90, 180, 270.
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Normalise any multiple of 90 (negative values included) into a
    /// rotation. Returns `None` for angles that are not quarter turns.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Self::Deg0,
            90 => Self::Deg90,
            180 => Self::Deg180,
            _ => Self::Deg270,
        })
    }

    /// Apply one quarter turn in the given direction.
    pub fn turned(self, direction: RotationDirection) -> Self {
        let delta: i64 = match direction {
            RotationDirection::Clockwise => 90,
            RotationDirection::CounterClockwise => -90,
        };
        // Always a multiple of 90, so the fallback is unreachable.
        Self::from_degrees(i64::from(self.degrees()) + delta).unwrap_or_default()
    }

    /// Whether the page's displayed width and height are swapped.
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// On-screen pixel size of a rendered page, as reported by the preview
/// surface. Needed wherever percentages must respect the page's own aspect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageViewport {
    pub width_px: f64,
    pub height_px: f64,
}

impl PageViewport {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    /// Width over height of the rendered page. Degenerate viewports are
    /// treated as square.
    pub fn aspect(&self) -> f64 {
        if self.width_px > 0.0 && self.height_px > 0.0 {
            self.width_px / self.height_px
        } else {
            1.0
        }
    }
}

/// A redaction rectangle as sent to the remote backend: 0-indexed page and
/// top-left-origin percentages of the displayed page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedactionArea {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The kind of client-side output being produced; drives file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    Organized,
    Merged,
    Signed,
    Redacted,
    /// One part of a split, 1-indexed.
    SplitPart(usize),
}

impl OutputKind {
    /// Filename suffix including the `.pdf` extension.
    pub fn suffix(&self) -> String {
        match self {
            Self::Organized => "_organized.pdf".into(),
            Self::Merged => "_merged.pdf".into(),
            Self::Signed => "_signed.pdf".into(),
            Self::Redacted => "_redacted.pdf".into(),
            Self::SplitPart(n) => format!("_part_{n}.pdf"),
        }
    }
}

/// Derive an output filename from the input filename and operation.
///
/// The input's extension (if any) is dropped; a blank input falls back to
/// `document`.
pub fn output_file_name(input_name: &str, kind: OutputKind) -> String {
    format!("{}{}", file_stem(input_name), kind.suffix())
}

/// Filename without directory components or its final extension.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match base.rfind('.') {
        Some(0) | None => base,
        Some(dot) => &base[..dot],
    };
    if stem.trim().is_empty() {
        "document"
    } else {
        stem
    }
}
