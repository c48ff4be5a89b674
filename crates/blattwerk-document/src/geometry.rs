// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate model — page-relative percentage geometry shared by signature
// placement and redaction marking, plus the conversions to on-screen pixels
// and to PDF point space.
//
// All stored geometry is a percentage (0..=100) of the displayed page's width
// or height with a top-left origin. Width and height are independent
// percentages, so any aspect-ratio math has to fold in the page's own pixel
// aspect (see `height_for_width`).

use blattwerk_core::{PageViewport, Rotation};
use serde::{Deserialize, Serialize};

/// Default minimum overlay width/height in percent.
pub const MIN_OVERLAY_PERCENT: f64 = 3.0;

/// `v` limited to `[lo, hi]`. Unlike `f64::clamp` this never panics: when
/// `lo > hi` the upper bound wins. Non-finite input collapses to `lo`.
fn bounded(v: f64, lo: f64, hi: f64) -> f64 {
    if !v.is_finite() {
        return lo.min(hi);
    }
    v.max(lo).min(hi)
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

/// A point in page percentages, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle in page percentages; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> PercentPoint {
        PercentPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the rectangle satisfies the on-page invariants.
    pub fn is_on_page(&self) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.width >= 0.0
            && self.height >= 0.0
            && self.right() <= 100.0 + EPS
            && self.bottom() <= 100.0 + EPS
    }

    /// Enforce the on-page invariants: size within `[min_size, 100]`, then
    /// position shifted so the rectangle lies fully on the page.
    pub fn clamped(self, min_size: f64) -> Self {
        let min = bounded(min_size, 0.0, 100.0);
        let width = bounded(finite_or(self.width, min), min, 100.0);
        let height = bounded(finite_or(self.height, min), min, 100.0);
        Self {
            x: bounded(finite_or(self.x, 0.0), 0.0, 100.0 - width),
            y: bounded(finite_or(self.y, 0.0), 0.0, 100.0 - height),
            width,
            height,
        }
    }

    /// Rectangle spanned by two pointer positions, in any drag direction.
    pub fn from_corners(a: PercentPoint, b: PercentPoint, min_size: f64) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self::new(left, top, (a.x - b.x).abs(), (a.y - b.y).abs()).clamped(min_size)
    }

    /// Rectangle of the given size centred on `center`, pushed back onto the
    /// page if it would overhang an edge.
    pub fn centered_at(center: PercentPoint, width: f64, height: f64, min_size: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
        .clamped(min_size)
    }

    /// Move by a percentage delta, keeping the size and staying on the page.
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: bounded(self.x + finite_or(dx, 0.0), 0.0, 100.0 - self.width),
            y: bounded(self.y + finite_or(dy, 0.0), 0.0, 100.0 - self.height),
            ..self
        }
    }
}

/// Screen-space bounds of the rendered page element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn viewport(&self) -> PageViewport {
        PageViewport::new(self.width, self.height)
    }
}

/// A rectangle in pixels relative to the page element, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a pointer location into page percentages, clamped to `[0, 100]`.
pub fn to_percentage(pointer_x: f64, pointer_y: f64, bounds: &PixelBounds) -> PercentPoint {
    let axis = |pointer: f64, origin: f64, extent: f64| {
        if extent <= 0.0 {
            0.0
        } else {
            bounded(100.0 * (pointer - origin) / extent, 0.0, 100.0)
        }
    };
    PercentPoint::new(
        axis(pointer_x, bounds.left, bounds.width),
        axis(pointer_y, bounds.top, bounds.height),
    )
}

/// Convert a stored rectangle into pixels for the current page size. Must be
/// recomputed whenever the preview is zoomed or resized.
pub fn to_pixels(rect: &PercentRect, bounds: &PixelBounds) -> PixelRect {
    PixelRect {
        left: rect.x / 100.0 * bounds.width,
        top: rect.y / 100.0 * bounds.height,
        width: rect.width / 100.0 * bounds.width,
        height: rect.height / 100.0 * bounds.height,
    }
}

/// Height percentage that keeps an image of `aspect_ratio` (pixel width over
/// pixel height) undistorted at `width_percent` on this page.
pub fn height_for_width(width_percent: f64, aspect_ratio: f64, viewport: PageViewport) -> f64 {
    width_percent * viewport.aspect() / sane_aspect(aspect_ratio)
}

/// Inverse of [`height_for_width`].
pub fn width_for_height(height_percent: f64, aspect_ratio: f64, viewport: PageViewport) -> f64 {
    height_percent * sane_aspect(aspect_ratio) / viewport.aspect()
}

fn sane_aspect(aspect_ratio: f64) -> f64 {
    if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        1.0
    }
}

/// A resize handle; the opposite corner stays fixed while it is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// +1 when this corner sits on the right edge, -1 on the left.
    fn horizontal(self) -> f64 {
        match self {
            Self::TopRight | Self::BottomRight => 1.0,
            Self::TopLeft | Self::BottomLeft => -1.0,
        }
    }

    /// +1 when this corner sits on the bottom edge, -1 on the top.
    fn vertical(self) -> f64 {
        match self {
            Self::BottomLeft | Self::BottomRight => 1.0,
            Self::TopLeft | Self::TopRight => -1.0,
        }
    }
}

/// The fixed corner's coordinates and the room left on the page in the
/// direction the dragged corner grows.
fn anchor_and_room(start: &PercentRect, corner: Corner) -> ((f64, f64), (f64, f64)) {
    let (anchor_x, room_x) = if corner.horizontal() > 0.0 {
        (start.x, 100.0 - start.x)
    } else {
        (start.right(), start.right())
    };
    let (anchor_y, room_y) = if corner.vertical() > 0.0 {
        (start.y, 100.0 - start.y)
    } else {
        (start.bottom(), start.bottom())
    };
    ((anchor_x, anchor_y), (room_x.max(0.0), room_y.max(0.0)))
}

fn place_from_anchor(
    corner: Corner,
    (anchor_x, anchor_y): (f64, f64),
    width: f64,
    height: f64,
) -> PercentRect {
    let x = if corner.horizontal() > 0.0 {
        anchor_x
    } else {
        anchor_x - width
    };
    let y = if corner.vertical() > 0.0 {
        anchor_y
    } else {
        anchor_y - height
    };
    PercentRect {
        x: bounded(x, 0.0, 100.0 - width),
        y: bounded(y, 0.0, 100.0 - height),
        width,
        height,
    }
}

/// Free-form corner resize (redaction marks). `dx`/`dy` are the pointer's
/// total movement since the drag started, in percent.
pub fn resize_free(
    start: &PercentRect,
    corner: Corner,
    dx: f64,
    dy: f64,
    min_size: f64,
) -> PercentRect {
    let min = bounded(min_size, 0.0, 100.0);
    let (anchor, (room_x, room_y)) = anchor_and_room(start, corner);
    let width = bounded(
        start.width + corner.horizontal() * finite_or(dx, 0.0),
        min,
        room_x.max(min),
    );
    let height = bounded(
        start.height + corner.vertical() * finite_or(dy, 0.0),
        min,
        room_y.max(min),
    );
    place_from_anchor(corner, anchor, width.min(100.0), height.min(100.0))
}

/// Aspect-locked corner resize (signatures).
///
/// The axis with the larger on-screen pointer movement drives the new size;
/// the other dimension is derived so the image keeps `aspect_ratio` on a page
/// rendered at `viewport`. When the size floor and the page edges cannot both
/// be honoured, staying on the page and keeping the aspect win.
pub fn resize_with_aspect(
    start: &PercentRect,
    corner: Corner,
    dx: f64,
    dy: f64,
    aspect_ratio: f64,
    viewport: PageViewport,
    min_size: f64,
) -> PercentRect {
    let dx = finite_or(dx, 0.0);
    let dy = finite_or(dy, 0.0);
    let min = bounded(min_size, 0.0, 100.0);
    // height = width * ratio
    let ratio = height_for_width(1.0, aspect_ratio, viewport);

    let from_x = start.width + corner.horizontal() * dx;
    let from_y = (start.height + corner.vertical() * dy) / ratio;
    // Compare movement in pixels: one percent of width is `aspect` times one
    // percent of height.
    let candidate = if dx.abs() * viewport.aspect() >= dy.abs() {
        from_x
    } else {
        from_y
    };

    let (anchor, (room_x, room_y)) = anchor_and_room(start, corner);
    let page_max = 100.0_f64.min(100.0 / ratio);
    let max_width = room_x.min(room_y / ratio).min(page_max);
    let min_width = min.max(min / ratio).min(page_max);

    let width = if max_width >= min_width {
        bounded(candidate, min_width, max_width)
    } else {
        min_width
    };
    let height = (width * ratio).min(100.0);
    place_from_anchor(corner, anchor, width, height)
}

/// Map a rectangle measured on the page *as displayed* (after a clockwise
/// `/Rotate`) into the page's unrotated space, both with top-left origin.
pub fn displayed_to_unrotated(rect: &PercentRect, rotation: Rotation) -> PercentRect {
    let PercentRect {
        x,
        y,
        width: w,
        height: h,
    } = *rect;
    match rotation {
        Rotation::Deg0 => *rect,
        Rotation::Deg90 => PercentRect::new(y, 100.0 - x - w, h, w),
        Rotation::Deg180 => PercentRect::new(100.0 - x - w, 100.0 - y - h, w, h),
        Rotation::Deg270 => PercentRect::new(100.0 - y - h, x, h, w),
    }
}

/// The visible page area in PDF points (CropBox or MediaBox).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// Build from a PDF rectangle `[llx lly urx ury]`, tolerating swapped
    /// corners.
    pub fn from_corners(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            x0: llx.min(urx),
            y0: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    /// US Letter, the fallback when a page carries no usable box.
    pub fn letter() -> Self {
        Self::from_corners(0.0, 0.0, 612.0, 792.0)
    }
}

/// A rectangle in PDF user space: points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert an (unrotated) percentage rectangle into PDF points.
///
/// Percentages run downward from the top edge; PDF user space runs upward
/// from the bottom edge, so the top of the rectangle sits at
/// `page_height - y%` and its origin one rectangle-height below that.
pub fn percent_to_points(rect: &PercentRect, page: &PageBox) -> PointRect {
    let width = rect.width / 100.0 * page.width;
    let height = rect.height / 100.0 * page.height;
    PointRect {
        x: page.x0 + rect.x / 100.0 * page.width,
        y: page.y0 + page.height - rect.y / 100.0 * page.height - height,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn pointer_to_percentage_is_clamped() {
        let bounds = PixelBounds::new(100.0, 50.0, 600.0, 800.0);
        let inside = to_percentage(400.0, 450.0, &bounds);
        assert!(approx(inside.x, 50.0));
        assert!(approx(inside.y, 50.0));

        let outside = to_percentage(-20.0, 5000.0, &bounds);
        assert_eq!(outside, PercentPoint::new(0.0, 100.0));
    }

    #[test]
    fn zero_sized_bounds_do_not_divide_by_zero() {
        let bounds = PixelBounds::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(to_percentage(10.0, 10.0, &bounds), PercentPoint::new(0.0, 0.0));
    }

    #[test]
    fn pixels_follow_zoom() {
        let rect = PercentRect::new(10.0, 20.0, 30.0, 40.0);
        let small = to_pixels(&rect, &PixelBounds::new(0.0, 0.0, 200.0, 100.0));
        assert!(approx(small.left, 20.0) && approx(small.top, 20.0));
        let zoomed = to_pixels(&rect, &PixelBounds::new(0.0, 0.0, 400.0, 200.0));
        assert!(approx(zoomed.width, 120.0) && approx(zoomed.height, 80.0));
    }

    #[test]
    fn clamp_pulls_rect_back_on_page() {
        let rect = PercentRect::new(95.0, -4.0, 20.0, 1.0).clamped(MIN_OVERLAY_PERCENT);
        assert!(approx(rect.x, 80.0));
        assert!(approx(rect.y, 0.0));
        assert!(approx(rect.height, MIN_OVERLAY_PERCENT));
        assert!(rect.is_on_page());
    }

    #[test]
    fn clamp_handles_nan() {
        let rect = PercentRect::new(f64::NAN, 10.0, f64::NAN, 10.0).clamped(3.0);
        assert!(rect.is_on_page());
        assert!(approx(rect.width, 3.0));
    }

    #[test]
    fn corners_in_any_order_make_same_rect() {
        let a = PercentPoint::new(60.0, 10.0);
        let b = PercentPoint::new(20.0, 30.0);
        assert_eq!(
            PercentRect::from_corners(a, b, 3.0),
            PercentRect::from_corners(b, a, 3.0)
        );
        assert_eq!(
            PercentRect::from_corners(a, b, 3.0),
            PercentRect::new(20.0, 10.0, 40.0, 20.0)
        );
    }

    #[test]
    fn free_resize_keeps_opposite_corner() {
        let start = PercentRect::new(20.0, 20.0, 20.0, 10.0);
        let grown = resize_free(&start, Corner::TopLeft, -5.0, -5.0, 3.0);
        assert!(approx(grown.right(), 40.0));
        assert!(approx(grown.bottom(), 30.0));
        assert!(approx(grown.width, 25.0));
    }

    #[test]
    fn free_resize_never_inverts() {
        let start = PercentRect::new(20.0, 20.0, 20.0, 10.0);
        let shrunk = resize_free(&start, Corner::BottomRight, -500.0, -500.0, 3.0);
        assert!(approx(shrunk.width, 3.0) && approx(shrunk.height, 3.0));
        assert!(approx(shrunk.x, 20.0));
        let grown = resize_free(&start, Corner::BottomRight, 500.0, 500.0, 3.0);
        assert!(grown.is_on_page());
        assert!(approx(grown.right(), 100.0));
    }

    #[test]
    fn aspect_resize_preserves_ratio() {
        let viewport = PageViewport::new(600.0, 800.0);
        let start = PercentRect::new(40.0, 40.0, 15.0, height_for_width(15.0, 2.0, viewport));
        let rect = resize_with_aspect(&start, Corner::BottomRight, 10.0, 1.0, 2.0, viewport, 3.0);
        assert!(approx(rect.width, 25.0));
        // Displayed pixel aspect: (w% * 600) / (h% * 800).
        let observed = rect.width / rect.height * (600.0 / 800.0);
        assert!((observed - 2.0).abs() < 1e-9);
        assert!(approx(rect.x, 40.0) && approx(rect.y, 40.0));
    }

    #[test]
    fn aspect_resize_stops_at_page_edge() {
        let viewport = PageViewport::new(600.0, 800.0);
        let start = PercentRect::new(80.0, 10.0, 15.0, 5.625);
        let rect = resize_with_aspect(&start, Corner::TopRight, 300.0, 0.0, 2.0, viewport, 3.0);
        assert!(rect.is_on_page());
        assert!(approx(rect.right(), 100.0));
    }

    #[test]
    fn unrotation_round_trips_through_four_quarter_turns() {
        let rect = PercentRect::new(10.0, 20.0, 30.0, 5.0);
        let once = displayed_to_unrotated(&rect, Rotation::Deg90);
        assert_eq!(once, PercentRect::new(20.0, 60.0, 5.0, 30.0));
        let back = displayed_to_unrotated(
            &displayed_to_unrotated(&displayed_to_unrotated(&once, Rotation::Deg90), Rotation::Deg90),
            Rotation::Deg90,
        );
        assert!(approx(back.x, rect.x) && approx(back.y, rect.y));
        assert!(approx(back.width, rect.width) && approx(back.height, rect.height));
    }

    #[test]
    fn percent_to_points_flips_y_axis() {
        let page = PageBox::from_corners(0.0, 0.0, 600.0, 800.0);
        let top_left = percent_to_points(&PercentRect::new(0.0, 0.0, 10.0, 10.0), &page);
        assert!(approx(top_left.x, 0.0));
        assert!(approx(top_left.y, 720.0));
        assert!(approx(top_left.width, 60.0) && approx(top_left.height, 80.0));

        let bottom = percent_to_points(&PercentRect::new(50.0, 90.0, 10.0, 10.0), &page);
        assert!(approx(bottom.y, 0.0));
    }

    #[test]
    fn percent_to_points_respects_box_origin() {
        let page = PageBox::from_corners(50.0, 100.0, 250.0, 300.0);
        let rect = percent_to_points(&PercentRect::new(50.0, 25.0, 10.0, 10.0), &page);
        assert!(approx(rect.x, 150.0));
        assert!(approx(rect.y, 100.0 + 200.0 - 50.0 - 20.0));
    }
}
