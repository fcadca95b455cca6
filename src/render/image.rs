use std::sync::Arc;

use crate::foundation::core::{IntSize, Rgba8Premul};
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::bitmap::Bitmap;
use crate::pixels::format::{AlphaType, BitmapFormat};

/// Immutable capture of surface pixels as premultiplied RGBA8.
///
/// Cloning shares the pixel data; nothing can write to it after construction, so later
/// draws to the surface it came from never show up here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    size: IntSize,
    data: Arc<[u8]>,
}

impl Image {
    /// Wrap tightly packed premultiplied RGBA8 bytes.
    pub fn from_rgba8_premul(size: IntSize, data: Vec<u8>) -> SurfaceResult<Self> {
        let expected = size.rgba8_len()?;
        if data.len() != expected {
            return Err(SurfaceError::validation(format!(
                "image of {size} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            size,
            data: data.into(),
        })
    }

    /// Size in pixels.
    pub fn size(&self) -> IntSize {
        self.size
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Packed premultiplied RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let off = (y as usize * self.size.width as usize + x as usize) * 4;
        let d = &self.data[off..off + 4];
        Some(Rgba8Premul::from_array([d[0], d[1], d[2], d[3]]))
    }

    /// Copy into a freshly allocated bitmap of the requested layout.
    pub fn to_bitmap(&self, format: BitmapFormat, alpha_type: AlphaType) -> SurfaceResult<Bitmap> {
        let bitmap = Bitmap::new(format, alpha_type, self.size)?;
        bitmap.store_rgba8_premul(&self.data)?;
        Ok(bitmap)
    }

    /// Return `true` when both images share the same pixel allocation.
    pub fn shares_data_with(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
