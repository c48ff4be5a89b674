// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature image references — encoded bytes plus the pixel size needed for
// aspect-locked placement. Decoding uses the `image` crate.

use std::io::Cursor;
use std::sync::Arc;

use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// Encoded container format of an overlay image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Detect the format from the leading marker bytes. Anything that is not
    /// recognisably JPEG is treated as PNG.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else {
            Self::Png
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Shared, immutable handle to an encoded signature image.
///
/// Cloning is cheap, so history snapshots can hold many copies.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    bytes: Arc<[u8]>,
    kind: ImageKind,
    width_px: u32,
    height_px: u32,
}

impl ImageRef {
    /// Wrap encoded image bytes, decoding them once to validate and to learn
    /// the pixel size.
    #[instrument(skip(bytes))]
    pub fn from_encoded(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let kind = ImageKind::sniff(&bytes);
        let decoded = decode(&bytes, kind)?;
        debug!(
            ?kind,
            width = decoded.width(),
            height = decoded.height(),
            "signature image accepted"
        );
        Self::with_size(bytes, kind, decoded.width(), decoded.height())
    }

    /// Encode an already-rendered image as PNG.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|err| BlattwerkError::ImageDecode(format!("PNG encoding failed: {err}")))?;
        Self::with_size(buffer.into(), ImageKind::Png, image.width(), image.height())
    }

    fn with_size(bytes: Arc<[u8]>, kind: ImageKind, width_px: u32, height_px: u32) -> Result<Self> {
        if width_px == 0 || height_px == 0 {
            return Err(BlattwerkError::ImageDecode("image has no pixels".into()));
        }
        Ok(Self {
            bytes,
            kind,
            width_px,
            height_px,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Pixel width over pixel height.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width_px) / f64::from(self.height_px)
    }

    /// Decode to pixels.
    pub fn decode(&self) -> Result<DynamicImage> {
        decode(&self.bytes, self.kind)
    }
}

fn decode(bytes: &[u8], kind: ImageKind) -> Result<DynamicImage> {
    image::load_from_memory_with_format(bytes, kind.image_format())
        .map_err(|err| BlattwerkError::ImageDecode(format!("{kind:?} decode failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn sniff_defaults_to_png() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageKind::Jpeg);
        assert_eq!(ImageKind::sniff(b"\x89PNG\r\n\x1a\n"), ImageKind::Png);
        assert_eq!(ImageKind::sniff(b"??"), ImageKind::Png);
    }

    #[test]
    fn rendered_image_round_trips_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255])));
        let image_ref = ImageRef::from_dynamic(&img).expect("encode");
        assert_eq!(image_ref.kind(), ImageKind::Png);
        assert!((image_ref.aspect_ratio() - 2.0).abs() < 1e-12);

        let reloaded = ImageRef::from_encoded(image_ref.bytes().to_vec()).expect("decode");
        assert_eq!((reloaded.width_px(), reloaded.height_px()), (200, 100));
    }

    #[test]
    fn garbage_is_an_image_decode_error() {
        let result = ImageRef::from_encoded(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(BlattwerkError::ImageDecode(_))));
    }
}
