// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Freehand signature pad. Pointer strokes are kept as polylines and only
// rasterised (via `imageproc`) when the signature is saved.

use blattwerk_core::error::Result;
use blattwerk_core::{AppConfig, BlattwerkError};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use tracing::{debug, instrument};

use crate::raster::ImageRef;

/// One pointer-down … pointer-up polyline, in canvas pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stroke {
    pub points: Vec<(f32, f32)>,
}

/// Drawing surface for a handwritten signature.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen_width: f32,
    ink: Rgba<u8>,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32, pen_width: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pen_width: pen_width.max(1.0),
            ink: Rgba([0, 0, 0, 255]),
            strokes: Vec::new(),
            active: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.signature_pad_width,
            config.signature_pad_height,
            config.pen_width,
        )
    }

    pub fn set_ink(&mut self, ink: Rgba<u8>) {
        self.ink = ink;
    }

    // -- Pointer input --------------------------------------------------------

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        // A missed pointer-up must not swallow the previous stroke.
        self.pointer_up();
        self.active = Some(Stroke {
            points: vec![self.clamp_point(x, y)],
        });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let point = self.clamp_point(x, y);
        if let Some(stroke) = self.active.as_mut() {
            stroke.points.push(point);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }

    // -- Editing --------------------------------------------------------------

    pub fn undo_stroke(&mut self) -> bool {
        self.active = None;
        self.strokes.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    /// Whether nothing has been drawn yet.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.is_none()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    // -- Output ---------------------------------------------------------------

    /// Rasterise the strokes onto a transparent canvas and encode as PNG.
    ///
    /// Rejected with a validation error while the pad is empty.
    #[instrument(skip(self), fields(strokes = self.strokes.len()))]
    pub fn save(&mut self) -> Result<ImageRef> {
        self.pointer_up();
        if self.strokes.is_empty() {
            return Err(BlattwerkError::validation(
                "Please draw your signature before saving.",
            ));
        }
        let canvas = self.rasterize();
        debug!(width = self.width, height = self.height, "signature rasterised");
        ImageRef::from_dynamic(&DynamicImage::ImageRgba8(canvas))
    }

    fn rasterize(&self) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, 0]));
        let radius = (self.pen_width / 2.0).round() as i32;
        for stroke in &self.strokes {
            match stroke.points.as_slice() {
                [] => {}
                [single] => self.dot(&mut canvas, *single, radius),
                points => {
                    for pair in points.windows(2) {
                        self.segment(&mut canvas, pair[0], pair[1], radius);
                    }
                }
            }
        }
        canvas
    }

    fn dot(&self, canvas: &mut RgbaImage, (x, y): (f32, f32), radius: i32) {
        draw_filled_circle_mut(canvas, (x.round() as i32, y.round() as i32), radius.max(1), self.ink);
    }

    fn segment(&self, canvas: &mut RgbaImage, from: (f32, f32), to: (f32, f32), radius: i32) {
        if radius <= 1 {
            draw_line_segment_mut(canvas, from, to, self.ink);
            return;
        }
        // Thick pen: stamp discs along the segment, one per pixel travelled.
        let length = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
        let steps = length.ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let point = (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
            self.dot(canvas, point, radius);
        }
    }

    fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        (finite(x).clamp(0.0, max_x), finite(y).clamp(0.0, max_y))
    }
}
