pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied RGBA8 with an extra `opacity` multiplier on `src`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Reverse the row order of a packed 4-byte-per-pixel buffer.
#[cfg(feature = "gpu")]
pub(crate) fn flip_rows(data: &mut [u8], width: usize) {
    let row = width * 4;
    if row == 0 {
        return;
    }
    let rows = data.len() / row;
    for y in 0..rows / 2 {
        let (head, tail) = data.split_at_mut((rows - 1 - y) * row);
        head[y * row..(y + 1) * row].swap_with_slice(&mut tail[..row]);
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
