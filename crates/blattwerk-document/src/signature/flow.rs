// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature workflow state machine:
//
//   Idle → Configuring(mode) → Ready(image) ⟲ place … → Idle (pause/clear)
//
// Ready is re-entrant: placing a signature does not consume the configured
// image, so one signature can be stamped onto many pages.

use blattwerk_core::error::Result;
use blattwerk_core::{BlattwerkError, OverlayId, PageViewport};
use tracing::{debug, info};

use crate::geometry::PercentPoint;
use crate::placement::PlacementEngine;
use crate::raster::ImageRef;
use crate::signature::pad::SignaturePad;
use crate::signature::text::{TextSignatureStyle, render_text_signature};

/// How the signature image is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    Draw,
    Upload,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Configuring(SignatureMode),
    Ready {
        mode: SignatureMode,
        image: ImageRef,
    },
}

#[derive(Debug, Clone)]
pub struct SignatureFlow {
    state: FlowState,
    /// Signature kept across a pause so it can be resumed.
    parked: Option<(SignatureMode, ImageRef)>,
}

impl Default for SignatureFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            parked: None,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, FlowState::Ready { .. })
    }

    /// Choose (or switch) the signature source. Switching drops any image
    /// configured for another mode.
    pub fn configure(&mut self, mode: SignatureMode) {
        if let FlowState::Ready { mode: current, .. } = &self.state
            && *current == mode
        {
            return;
        }
        debug!(?mode, "configuring signature");
        self.state = FlowState::Configuring(mode);
    }

    /// Save the pad's drawing as the active signature.
    pub fn use_drawing(&mut self, pad: &mut SignaturePad) -> Result<()> {
        self.expect_mode(SignatureMode::Draw)?;
        let image = pad.save()?;
        self.become_ready(SignatureMode::Draw, image);
        Ok(())
    }

    /// Use uploaded image bytes as the active signature.
    pub fn use_upload(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.expect_mode(SignatureMode::Upload)?;
        let image = ImageRef::from_encoded(bytes)?;
        self.become_ready(SignatureMode::Upload, image);
        Ok(())
    }

    /// Render typed text as the active signature.
    pub fn use_text(&mut self, text: &str, font_data: &[u8], style: &TextSignatureStyle) -> Result<()> {
        self.expect_mode(SignatureMode::Text)?;
        let image = render_text_signature(text, font_data, style)?;
        self.become_ready(SignatureMode::Text, image);
        Ok(())
    }

    /// Place the configured signature on a page. Stays Ready afterwards.
    pub fn place_at(
        &self,
        engine: &mut PlacementEngine,
        page_index: usize,
        center: PercentPoint,
        viewport: PageViewport,
    ) -> Result<OverlayId> {
        match &self.state {
            FlowState::Ready { image, .. } => {
                Ok(engine.place(page_index, center, image.clone(), viewport))
            }
            _ => Err(BlattwerkError::validation(
                "Create a signature before placing it on the page.",
            )),
        }
    }

    /// Stop placing; the signature can be picked up again with
    /// [`Self::resume`].
    pub fn pause(&mut self) {
        if let FlowState::Ready { mode, image } = std::mem::replace(&mut self.state, FlowState::Idle) {
            self.parked = Some((mode, image));
        }
    }

    /// Return to Ready with the signature held before the last pause.
    pub fn resume(&mut self) -> bool {
        match self.parked.take() {
            Some((mode, image)) if self.state == FlowState::Idle => {
                self.state = FlowState::Ready { mode, image };
                true
            }
            parked => {
                self.parked = parked;
                false
            }
        }
    }

    /// Forget the configured signature entirely.
    pub fn clear(&mut self) {
        self.state = FlowState::Idle;
        self.parked = None;
    }

    fn expect_mode(&self, wanted: SignatureMode) -> Result<()> {
        let current = match &self.state {
            FlowState::Configuring(mode) | FlowState::Ready { mode, .. } => Some(*mode),
            FlowState::Idle => None,
        };
        if current == Some(wanted) {
            Ok(())
        } else {
            Err(BlattwerkError::validation(format!(
                "Switch to {wanted:?} mode first."
            )))
        }
    }

    fn become_ready(&mut self, mode: SignatureMode, image: ImageRef) {
        info!(?mode, width = image.width_px(), height = image.height_px(), "signature ready");
        self.parked = None;
        self.state = FlowState::Ready { mode, image };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_flow() -> SignatureFlow {
        let mut flow = SignatureFlow::new();
        flow.configure(SignatureMode::Draw);
        let mut pad = SignaturePad::new(120, 60, 3.0);
        pad.pointer_down(10.0, 30.0);
        pad.pointer_move(110.0, 30.0);
        flow.use_drawing(&mut pad).expect("drawing saved");
        flow
    }

    #[test]
    fn ready_state_is_reentrant() {
        let flow = ready_flow();
        let mut engine = PlacementEngine::default();
        let viewport = PageViewport::new(600.0, 800.0);
        for page in 0..3 {
            flow.place_at(&mut engine, page, PercentPoint::new(50.0, 50.0), viewport)
                .expect("placed");
        }
        assert!(flow.is_ready());
        assert_eq!(engine.overlays().len(), 3);
    }

    #[test]
    fn cannot_place_before_ready() {
        let mut flow = SignatureFlow::new();
        let mut engine = PlacementEngine::default();
        let viewport = PageViewport::new(600.0, 800.0);
        assert!(flow.place_at(&mut engine, 0, PercentPoint::new(1.0, 1.0), viewport).is_err());
        flow.configure(SignatureMode::Draw);
        assert!(flow.place_at(&mut engine, 0, PercentPoint::new(1.0, 1.0), viewport).is_err());
        assert!(engine.is_empty());
    }

    #[test]
    fn empty_drawing_keeps_configuring() {
        let mut flow = SignatureFlow::new();
        flow.configure(SignatureMode::Draw);
        let mut pad = SignaturePad::new(100, 50, 2.0);
        assert!(flow.use_drawing(&mut pad).is_err());
        assert_eq!(flow.state(), &FlowState::Configuring(SignatureMode::Draw));
    }

    #[test]
    fn wrong_mode_is_rejected() {
        let mut flow = SignatureFlow::new();
        flow.configure(SignatureMode::Text);
        assert!(flow.use_upload(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn pause_then_resume_restores_signature() {
        let mut flow = ready_flow();
        flow.pause();
        assert_eq!(flow.state(), &FlowState::Idle);
        assert!(flow.resume());
        assert!(flow.is_ready());
        flow.clear();
        assert!(!flow.resume());
    }

    #[test]
    fn switching_mode_drops_image() {
        let mut flow = ready_flow();
        flow.configure(SignatureMode::Upload);
        assert_eq!(flow.state(), &FlowState::Configuring(SignatureMode::Upload));
    }
}
