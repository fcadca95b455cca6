use crate::foundation::core::IntSize;

/// Byte layout of a 4-byte-per-pixel bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitmapFormat {
    /// Blue, green, red, alpha.
    Bgra8888,
    /// Blue, green, red, unused (treated as opaque).
    Bgrx8888,
    /// Red, green, blue, alpha.
    Rgba8888,
    /// Red, green, blue, unused (treated as opaque).
    Rgbx8888,
}

impl BitmapFormat {
    /// Bytes per pixel; every supported format is 32-bit.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Return `true` when the fourth byte carries alpha.
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra8888 | Self::Rgba8888)
    }

    fn is_bgr(self) -> bool {
        matches!(self, Self::Bgra8888 | Self::Bgrx8888)
    }
}

/// How color channels of a bitmap relate to its alpha channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaType {
    /// Color channels are already multiplied by alpha.
    Premultiplied,
    /// Color channels are straight (not multiplied by alpha).
    Unpremultiplied,
}

/// Backend-native color type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// 8-bit BGRA.
    Bgra8888,
    /// 8-bit RGBA.
    Rgba8888,
    /// 8-bit RGB with an ignored fourth byte.
    Rgb888x,
}

/// Backend-native alpha interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendAlphaType {
    /// All pixels are opaque; stored alpha is ignored.
    Opaque,
    /// Premultiplied alpha.
    Premul,
    /// Straight alpha.
    Unpremul,
}

/// Map a bitmap format to the backend color type.
pub fn to_color_type(format: BitmapFormat) -> ColorType {
    match format {
        BitmapFormat::Bgra8888 => ColorType::Bgra8888,
        BitmapFormat::Rgba8888 => ColorType::Rgba8888,
        // BGRx has no dedicated backend type; the ignored byte is covered by an opaque alpha type.
        BitmapFormat::Bgrx8888 => ColorType::Bgra8888,
        BitmapFormat::Rgbx8888 => ColorType::Rgb888x,
    }
}

/// Map a bitmap format and alpha policy to the backend alpha type.
pub fn to_backend_alpha_type(format: BitmapFormat, alpha_type: AlphaType) -> BackendAlphaType {
    if !format.has_alpha() {
        return BackendAlphaType::Opaque;
    }
    match alpha_type {
        AlphaType::Premultiplied => BackendAlphaType::Premul,
        AlphaType::Unpremultiplied => BackendAlphaType::Unpremul,
    }
}

/// Dimensions and pixel interpretation of a surface, as handed to backend contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    /// Size in pixels.
    pub size: IntSize,
    /// Backend color type.
    pub color_type: ColorType,
    /// Backend alpha type.
    pub alpha_type: BackendAlphaType,
}

impl ImageInfo {
    /// Describe a bitmap format/alpha pair at `size`.
    pub fn new(size: IntSize, format: BitmapFormat, alpha_type: AlphaType) -> Self {
        Self {
            size,
            color_type: to_color_type(format),
            alpha_type: to_backend_alpha_type(format, alpha_type),
        }
    }
}

/// Decode one stored pixel into premultiplied `[r, g, b, a]`.
pub(crate) fn decode_pixel(format: BitmapFormat, alpha_type: AlphaType, px: [u8; 4]) -> [u8; 4] {
    let [r, g, b] = if format.is_bgr() {
        [px[2], px[1], px[0]]
    } else {
        [px[0], px[1], px[2]]
    };
    if !format.has_alpha() {
        return [r, g, b, 255];
    }
    let a = px[3];
    match alpha_type {
        AlphaType::Premultiplied => [r, g, b, a],
        AlphaType::Unpremultiplied => [premul(r, a), premul(g, a), premul(b, a), a],
    }
}

/// Encode premultiplied `[r, g, b, a]` into the stored layout.
pub(crate) fn encode_pixel(format: BitmapFormat, alpha_type: AlphaType, px: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = px;
    let (r, g, b, a) = if !format.has_alpha() {
        (r, g, b, 255)
    } else {
        match alpha_type {
            AlphaType::Premultiplied => (r, g, b, a),
            AlphaType::Unpremultiplied => (unpremul(r, a), unpremul(g, a), unpremul(b, a), a),
        }
    };
    if format.is_bgr() {
        [b, g, r, a]
    } else {
        [r, g, b, a]
    }
}

fn premul(c: u8, a: u8) -> u8 {
    ((u16::from(c) * u16::from(a) + 127) / 255) as u8
}

fn unpremul(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    let v = (u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a);
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/pixels/format.rs"]
mod tests;
