use crate::foundation::core::{Affine, BezPath, Rect, Rgba8Premul};
use crate::pixels::format::{AlphaType, BitmapFormat, encode_pixel};
use crate::render::image::Image;

/// A recorded drawing command, replayed by a render target when a canvas commits.
#[derive(Clone, Debug)]
pub enum DrawOp {
    /// Replace every pixel with `color` (no blending).
    Clear {
        /// Replacement color.
        color: Rgba8Premul,
    },
    /// Fill an axis-aligned rectangle in local space.
    FillRect {
        /// Rectangle in local coordinates.
        rect: Rect,
        /// Local-to-surface transform.
        transform: Affine,
        /// Fill color.
        color: Rgba8Premul,
    },
    /// Fill a path with the non-zero rule.
    FillPath {
        /// Path in local coordinates.
        path: BezPath,
        /// Local-to-surface transform.
        transform: Affine,
        /// Fill color.
        color: Rgba8Premul,
    },
    /// Draw an image with its top-left corner at the local origin.
    DrawImage {
        /// Pixels to draw.
        image: Image,
        /// Local-to-surface transform.
        transform: Affine,
        /// Extra opacity in `[0, 1]`.
        opacity: f32,
    },
}

/// Straight-alpha `[r, g, b, a]` for paint APIs that take unpremultiplied colors.
pub(crate) fn straight_rgba(color: Rgba8Premul) -> [u8; 4] {
    encode_pixel(
        BitmapFormat::Rgba8888,
        AlphaType::Unpremultiplied,
        color.to_array(),
    )
}
