use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::core::{IntRect, IntSize, Rgba8Premul};
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::format::{AlphaType, BitmapFormat, decode_pixel, encode_pixel};

/// Caller-visible pixel storage: a format, an alpha policy, a size, a row pitch and the bytes.
///
/// Pixels live behind a lock so one bitmap can be shared (`Arc<Bitmap>`) between its owner and
/// a CPU surface that renders into it without copying.
#[derive(Debug)]
pub struct Bitmap {
    format: BitmapFormat,
    alpha_type: AlphaType,
    size: IntSize,
    pitch: usize,
    data: RwLock<Vec<u8>>,
}

impl Bitmap {
    /// Allocate a zeroed, tightly packed bitmap.
    pub fn new(format: BitmapFormat, alpha_type: AlphaType, size: IntSize) -> SurfaceResult<Self> {
        let pitch = min_pitch(size)?;
        Self::with_pitch(format, alpha_type, size, pitch)
    }

    /// Allocate a zeroed bitmap whose rows are `pitch` bytes apart.
    pub fn with_pitch(
        format: BitmapFormat,
        alpha_type: AlphaType,
        size: IntSize,
        pitch: usize,
    ) -> SurfaceResult<Self> {
        let len = buffer_len(size, pitch)?;
        Ok(Self {
            format,
            alpha_type,
            size,
            pitch,
            data: RwLock::new(vec![0; len]),
        })
    }

    /// Adopt existing bytes laid out with `pitch` bytes per row.
    pub fn from_bytes(
        format: BitmapFormat,
        alpha_type: AlphaType,
        size: IntSize,
        pitch: usize,
        data: Vec<u8>,
    ) -> SurfaceResult<Self> {
        let len = buffer_len(size, pitch)?;
        if data.len() < len {
            return Err(SurfaceError::validation(format!(
                "bitmap of {size} with pitch {pitch} needs {len} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            format,
            alpha_type,
            size,
            pitch,
            data: RwLock::new(data),
        })
    }

    /// Pixel layout.
    pub fn format(&self) -> BitmapFormat {
        self.format
    }

    /// Alpha policy.
    pub fn alpha_type(&self) -> AlphaType {
        self.alpha_type
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

    /// Bytes between the starts of consecutive rows.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Bounds of the bitmap at the origin.
    pub fn rect(&self) -> IntRect {
        IntRect::from_size(self.size)
    }

    /// Shared access to the raw bytes.
    pub fn pixels(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the raw bytes.
    pub fn pixels_mut(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored bytes of the pixel at `(x, y)`, in this bitmap's own layout.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let off = self.offset(x, y)?;
        let data = self.pixels();
        Some([data[off], data[off + 1], data[off + 2], data[off + 3]])
    }

    /// Overwrite the stored bytes of the pixel at `(x, y)`.
    pub fn set_pixel(&self, x: u32, y: u32, px: [u8; 4]) -> SurfaceResult<()> {
        let off = self.offset(x, y).ok_or_else(|| {
            SurfaceError::validation(format!("pixel ({x}, {y}) outside bitmap of {}", self.size))
        })?;
        self.pixels_mut()[off..off + 4].copy_from_slice(&px);
        Ok(())
    }

    /// Pixel at `(x, y)` decoded to premultiplied RGBA.
    pub fn get_color(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        self.get_pixel(x, y)
            .map(|px| Rgba8Premul::from_array(decode_pixel(self.format, self.alpha_type, px)))
    }

    /// Fill every pixel with `color`.
    pub fn fill(&self, color: Rgba8Premul) {
        let px = encode_pixel(self.format, self.alpha_type, color.to_array());
        let row_bytes = self.size.width as usize * self.format.bytes_per_pixel();
        let mut data = self.pixels_mut();
        for row in data.chunks_mut(self.pitch).take(self.size.height as usize) {
            for dst in row[..row_bytes].chunks_exact_mut(4) {
                dst.copy_from_slice(&px);
            }
        }
    }

    /// Copy the contents into a tightly packed premultiplied RGBA8 buffer.
    pub fn to_rgba8_premul(&self) -> Vec<u8> {
        self.read_rgba8_premul(false)
    }

    /// Overwrite the contents from a tightly packed premultiplied RGBA8 buffer.
    pub fn store_rgba8_premul(&self, rgba: &[u8]) -> SurfaceResult<()> {
        self.write_rgba8_premul(rgba, false)
    }

    /// Copy pixels from `src` when both bitmaps share size, format and alpha policy.
    ///
    /// Rows are copied verbatim, so padding bytes and ignored channels survive the copy.
    pub(crate) fn copy_rows_from(&self, src: &Bitmap) -> SurfaceResult<()> {
        if src.size != self.size || src.format != self.format || src.alpha_type != self.alpha_type
        {
            return Err(SurfaceError::validation(
                "row copy requires identical size and pixel format",
            ));
        }
        let row_bytes = self.size.width as usize * self.format.bytes_per_pixel();
        let src_data = src.pixels();
        let mut dst_data = self.pixels_mut();
        for y in 0..self.size.height as usize {
            let s = &src_data[y * src.pitch..y * src.pitch + row_bytes];
            dst_data[y * self.pitch..y * self.pitch + row_bytes].copy_from_slice(s);
        }
        Ok(())
    }

    /// Decode into packed premultiplied RGBA8, optionally reversing the row order.
    pub(crate) fn read_rgba8_premul(&self, bottom_up: bool) -> Vec<u8> {
        let (w, h) = (self.size.width as usize, self.size.height as usize);
        let mut out = vec![0u8; w * h * 4];
        let data = self.pixels();
        for (y, dst_row) in out.chunks_exact_mut(w * 4).enumerate() {
            let src_y = if bottom_up { h - 1 - y } else { y };
            let src_row = &data[src_y * self.pitch..src_y * self.pitch + w * 4];
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                d.copy_from_slice(&decode_pixel(
                    self.format,
                    self.alpha_type,
                    [s[0], s[1], s[2], s[3]],
                ));
            }
        }
        out
    }

    /// Encode from packed premultiplied RGBA8, optionally reversing the row order.
    pub(crate) fn write_rgba8_premul(&self, rgba: &[u8], bottom_up: bool) -> SurfaceResult<()> {
        let expected = self.size.rgba8_len()?;
        if rgba.len() != expected {
            return Err(SurfaceError::validation(format!(
                "expected {expected} rgba8 bytes for {}, got {}",
                self.size,
                rgba.len()
            )));
        }
        let (w, h) = (self.size.width as usize, self.size.height as usize);
        let mut data = self.pixels_mut();
        for (y, src_row) in rgba.chunks_exact(w * 4).enumerate() {
            let dst_y = if bottom_up { h - 1 - y } else { y };
            let dst_row = &mut data[dst_y * self.pitch..dst_y * self.pitch + w * 4];
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                d.copy_from_slice(&encode_pixel(
                    self.format,
                    self.alpha_type,
                    [s[0], s[1], s[2], s[3]],
                ));
            }
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(y as usize * self.pitch + x as usize * self.format.bytes_per_pixel())
    }
}

fn min_pitch(size: IntSize) -> SurfaceResult<usize> {
    (size.width as usize)
        .checked_mul(4)
        .ok_or_else(|| SurfaceError::validation("bitmap width overflows pitch"))
}

fn buffer_len(size: IntSize, pitch: usize) -> SurfaceResult<usize> {
    if size.is_empty() {
        return Err(SurfaceError::validation(format!(
            "bitmap size must be non-empty, got {size}"
        )));
    }
    if pitch < min_pitch(size)? {
        return Err(SurfaceError::validation(format!(
            "pitch {pitch} is smaller than a {}-pixel row",
            size.width
        )));
    }
    pitch
        .checked_mul(size.height as usize)
        .ok_or_else(|| SurfaceError::validation(format!("bitmap of {size} overflows")))
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/bitmap.rs"]
mod tests;
