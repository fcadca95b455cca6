use std::sync::Arc;

use crate::context::Origin;
use crate::foundation::core::{Affine, BezPath, IntSize, Point};
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::bitmap::Bitmap;
use crate::pixels::format::{decode_pixel, encode_pixel};
use crate::render::composite::over;
use crate::render::image::Image;
use crate::render::ops::{DrawOp, straight_rgba};
use crate::render::target::{ContentChangeMode, RenderTarget};

/// Render target rasterized on the CPU with `vello_cpu` into a [`Bitmap`].
///
/// The bitmap is the storage of record: draws and uploads land in its bytes, in its own pixel
/// format, so a caller holding the same `Arc<Bitmap>` observes them directly.
pub struct CpuRenderTarget {
    storage: Arc<Bitmap>,
    origin: Origin,
    width: u16,
    height: u16,
    raster: Option<vello_cpu::RenderContext>,
}

impl CpuRenderTarget {
    /// Render into `storage` with rows stored top-down.
    pub fn new(storage: Arc<Bitmap>) -> SurfaceResult<Self> {
        Self::with_origin(storage, Origin::TopLeft)
    }

    /// Render into `storage`; with [`Origin::BottomLeft`] the first stored row is the bottom
    /// row of the image.
    pub fn with_origin(storage: Arc<Bitmap>, origin: Origin) -> SurfaceResult<Self> {
        let (width, height) = storage.size().to_u16()?;
        Ok(Self {
            storage,
            origin,
            width,
            height,
            raster: None,
        })
    }

    /// Bitmap receiving the pixels.
    pub fn storage(&self) -> &Arc<Bitmap> {
        &self.storage
    }

    /// Row order of the storage.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    fn bottom_up(&self) -> bool {
        self.origin == Origin::BottomLeft
    }

    fn is_storage(&self, bitmap: &Bitmap) -> bool {
        std::ptr::eq(bitmap, Arc::as_ptr(&self.storage))
    }

    /// Rasterize `ops` into a transparent, top-down premultiplied RGBA8 layer.
    fn rasterize(&mut self, ops: &[&DrawOp]) -> SurfaceResult<Option<Vec<u8>>> {
        if ops.is_empty() {
            return Ok(None);
        }
        let (w, h) = (self.width, self.height);
        let ctx = self
            .raster
            .get_or_insert_with(|| vello_cpu::RenderContext::new(w, h));
        ctx.reset();
        for op in ops {
            draw_op(ctx, op)?;
        }
        ctx.flush();

        let mut layer = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut layer);
        Ok(Some(layer.data_as_u8_slice().to_vec()))
    }
}

impl RenderTarget for CpuRenderTarget {
    fn size(&self) -> IntSize {
        self.storage.size()
    }

    fn draw(&mut self, ops: &[DrawOp]) -> SurfaceResult<()> {
        // Everything recorded before the last clear is overwritten by it.
        let last_clear = ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Clear { .. }));
        let clear = last_clear.and_then(|i| match &ops[i] {
            DrawOp::Clear { color } => Some(color.to_array()),
            _ => None,
        });
        let pending: Vec<&DrawOp> = ops[last_clear.map_or(0, |i| i + 1)..].iter().collect();
        let layer = self.rasterize(&pending)?;
        if clear.is_none() && layer.is_none() {
            return Ok(());
        }

        let (format, alpha_type) = (self.storage.format(), self.storage.alpha_type());
        let (w, h) = (usize::from(self.width), usize::from(self.height));
        let bpp = format.bytes_per_pixel();
        let pitch = self.storage.pitch();
        let bottom_up = self.bottom_up();

        // One write lock spans the whole read-modify-write. Pixels the layer leaves transparent
        // are not re-encoded unless a clear repaints them.
        let mut data = self.storage.pixels_mut();
        for y in 0..h {
            let stored_y = if bottom_up { h - 1 - y } else { y };
            let row = &mut data[stored_y * pitch..stored_y * pitch + w * bpp];
            for (x, dst) in row.chunks_exact_mut(bpp).enumerate() {
                let src = layer.as_ref().map_or([0; 4], |l| {
                    let i = (y * w + x) * 4;
                    [l[i], l[i + 1], l[i + 2], l[i + 3]]
                });
                let base = match clear {
                    Some(color) => color,
                    None if src[3] == 0 => continue,
                    None => decode_pixel(format, alpha_type, [dst[0], dst[1], dst[2], dst[3]]),
                };
                dst.copy_from_slice(&encode_pixel(format, alpha_type, over(base, src, 1.0)));
            }
        }
        Ok(())
    }

    fn read_rgba8_premul(&self) -> SurfaceResult<Vec<u8>> {
        Ok(self.storage.read_rgba8_premul(self.bottom_up()))
    }

    fn write_rgba8_premul(&mut self, rgba: &[u8]) -> SurfaceResult<()> {
        self.storage.write_rgba8_premul(rgba, self.bottom_up())
    }

    fn notify_content_will_change(&mut self, mode: ContentChangeMode) {
        if mode == ContentChangeMode::Discard {
            self.raster = None;
        }
    }

    fn read_pixels(&self, dst: &Bitmap) -> SurfaceResult<()> {
        if self.is_storage(dst) {
            return Ok(());
        }
        if !self.bottom_up()
            && dst.format() == self.storage.format()
            && dst.alpha_type() == self.storage.alpha_type()
        {
            return dst.copy_rows_from(&self.storage);
        }
        let rgba = self.read_rgba8_premul()?;
        dst.store_rgba8_premul(&rgba)
    }

    fn write_pixels(&mut self, src: &Bitmap) -> SurfaceResult<()> {
        if self.is_storage(src) {
            return Ok(());
        }
        if !self.bottom_up()
            && src.format() == self.storage.format()
            && src.alpha_type() == self.storage.alpha_type()
        {
            return self.storage.copy_rows_from(src);
        }
        let rgba = src.to_rgba8_premul();
        self.write_rgba8_premul(&rgba)
    }
}

fn draw_op(ctx: &mut vello_cpu::RenderContext, op: &DrawOp) -> SurfaceResult<()> {
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match op {
        DrawOp::Clear { .. } => Err(SurfaceError::backend(
            "clear must be resolved before rasterization",
        )),
        DrawOp::FillRect {
            rect,
            transform,
            color,
        } => {
            let [r, g, b, a] = straight_rgba(*color);
            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                rect.x0, rect.y0, rect.x1, rect.y1,
            ));
            Ok(())
        }
        DrawOp::FillPath {
            path,
            transform,
            color,
        } => {
            let [r, g, b, a] = straight_rgba(*color);
            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_path(&bezpath_to_cpu(path));
            Ok(())
        }
        DrawOp::DrawImage {
            image,
            transform,
            opacity,
        } => {
            let paint = image_to_paint(image)?;
            let (w, h) = (f64::from(image.width()), f64::from(image.height()));

            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(paint);
            if *opacity < 1.0 {
                ctx.push_opacity_layer(*opacity);
            }
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            if *opacity < 1.0 {
                ctx.pop_layer();
            }
            Ok(())
        }
    }
}

fn image_to_paint(image: &Image) -> SurfaceResult<vello_cpu::Image> {
    let (w, h) = image.size().to_u16()?;
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(image.size().area());
    for px in image.data().chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
