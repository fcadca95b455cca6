use std::fmt;

use crate::foundation::error::{SurfaceError, SurfaceResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Integer size in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IntSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IntSize {
    /// Create a size from `width` and `height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered by this size.
    pub fn area(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Byte length of a tightly packed 4-byte-per-pixel buffer of this size.
    pub fn rgba8_len(self) -> SurfaceResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| SurfaceError::validation(format!("pixel buffer for {self} overflows")))
    }

    /// Convert to rasterizer dimensions, which are limited to `u16`.
    pub(crate) fn to_u16(self) -> SurfaceResult<(u16, u16)> {
        let w: u16 = self
            .width
            .try_into()
            .map_err(|_| SurfaceError::validation("surface width exceeds u16"))?;
        let h: u16 = self
            .height
            .try_into()
            .map_err(|_| SurfaceError::validation("surface height exceeds u16"))?;
        Ok((w, h))
    }
}

impl fmt::Display for IntSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer rectangle anchored at `(x, y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IntRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Extent of the rectangle.
    pub size: IntSize,
}

impl IntRect {
    /// Rectangle at the origin covering `size`.
    pub fn from_size(size: IntSize) -> Self {
        Self { x: 0, y: 0, size }
    }

    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.size.height
    }

    /// Floating-point rectangle with the same bounds.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.size.width),
            f64::from(self.y) + f64::from(self.size.height),
        )
    }
}

/// Premultiplied RGBA8 color, the canonical pixel representation inside backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red, premultiplied by alpha.
    pub r: u8,
    /// Green, premultiplied by alpha.
    pub g: u8,
    /// Blue, premultiplied by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self::default()
    }

    /// Premultiply a straight-alpha color.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Bytes in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from bytes in `[r, g, b, a]` order.
    pub fn from_array(px: [u8; 4]) -> Self {
        Self {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
