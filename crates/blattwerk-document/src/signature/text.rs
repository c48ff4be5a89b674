// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed signatures — text rendered to a transparent PNG with a caller-chosen
// font. Glyph layout comes from `ab_glyph` via `imageproc::drawing`.

use ab_glyph::{FontRef, PxScale};
use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, instrument};

use crate::raster::ImageRef;

/// How a typed signature is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSignatureStyle {
    /// Font size in pixels.
    pub size_px: f32,
    pub color: Rgba<u8>,
    /// Transparent margin on every side, in pixels.
    pub padding: u32,
}

impl Default for TextSignatureStyle {
    fn default() -> Self {
        Self {
            size_px: 64.0,
            color: Rgba([0, 0, 0, 255]),
            padding: 20,
        }
    }
}

/// Parse `#rrggbb` / `rrggbb` into an opaque colour.
pub fn parse_hex_color(color: &str) -> Result<Rgba<u8>> {
    let hex = color.trim().trim_start_matches('#');
    let invalid = || BlattwerkError::validation(format!("'{color}' is not a #rrggbb colour"));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
    };
    Ok(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

/// Render `text` as a signature image sized to the measured text plus
/// padding. Empty or whitespace-only text is rejected.
#[instrument(skip(text, font_data, style), fields(text_len = text.len(), size = style.size_px))]
pub fn render_text_signature(
    text: &str,
    font_data: &[u8],
    style: &TextSignatureStyle,
) -> Result<ImageRef> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BlattwerkError::validation("Please type your name to sign."));
    }
    if !(style.size_px.is_finite() && style.size_px > 0.0) {
        return Err(BlattwerkError::validation("Font size must be positive."));
    }
    let font = FontRef::try_from_slice(font_data)
        .map_err(|err| BlattwerkError::validation(format!("font could not be read: {err}")))?;

    let scale = PxScale::from(style.size_px);
    let (text_w, text_h) = text_size(scale, &font, text);
    let width = text_w.max(1) + 2 * style.padding;
    let height = text_h.max(1) + 2 * style.padding;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    draw_text_mut(
        &mut canvas,
        style.color,
        style.padding as i32,
        style.padding as i32,
        scale,
        &font,
        text,
    );
    debug!(width, height, "text signature rendered");
    ImageRef::from_dynamic(&DynamicImage::ImageRgba8(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_parse() {
        assert_eq!(parse_hex_color("#1a2B3c").expect("valid"), Rgba([0x1a, 0x2b, 0x3c, 255]));
        assert_eq!(parse_hex_color("000000").expect("valid"), Rgba([0, 0, 0, 255]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("#ééé").is_err());
    }

    #[test]
    fn blank_text_is_rejected_before_font_parsing() {
        let style = TextSignatureStyle::default();
        for text in ["", "   ", "\n\t"] {
            assert!(matches!(
                render_text_signature(text, b"not a font", &style),
                Err(BlattwerkError::Validation(_))
            ));
        }
    }

    const FONT: &[u8] = include_bytes!("../../tests/fixtures/Montserrat-Regular.ttf");

    #[test]
    fn rendered_text_is_sized_to_measured_glyphs_plus_padding() {
        let style = TextSignatureStyle {
            size_px: 48.0,
            color: Rgba([10, 20, 200, 255]),
            padding: 12,
        };
        let image = render_text_signature("  Ada Lovelace ", FONT, &style).expect("render");

        let font = FontRef::try_from_slice(FONT).expect("font");
        let (text_w, text_h) = text_size(PxScale::from(48.0), &font, "Ada Lovelace");
        assert_eq!(image.width_px(), text_w + 24);
        assert_eq!(image.height_px(), text_h + 24);
        assert!(image.width_px() > image.height_px());

        let pixels = image.decode().expect("decode").to_rgba8();
        assert_eq!(pixels.get_pixel(0, 0).0[3], 0);
        let inked = pixels
            .pixels()
            .filter(|pixel| pixel.0[3] > 0 && pixel.0[2] > pixel.0[0])
            .count();
        assert!(inked > 50, "only {inked} inked pixels");
    }

    #[test]
    fn unreadable_font_is_a_validation_error() {
        let result = render_text_signature("Ada Lovelace", b"not a font", &TextSignatureStyle::default());
        assert!(matches!(result, Err(BlattwerkError::Validation(_))));
    }
}
