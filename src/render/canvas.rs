use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba8Premul, Vec2};
use crate::foundation::error::SurfaceResult;
use crate::render::image::Image;
use crate::render::ops::DrawOp;
use crate::render::target::RenderTarget;

const STROKE_TOLERANCE: f64 = 0.1;

/// Live drawing target bound to one surface.
///
/// Commands are recorded and replayed on the surface's render target by [`Canvas::commit`],
/// [`Canvas::finish`], or when the canvas is dropped. Builder chains end in `commit`, since the
/// drawing methods hand back `&mut Self`. The canvas borrows the surface mutably, so it cannot outlive
/// it or be held across other surface operations.
pub struct Canvas<'a> {
    target: &'a mut dyn RenderTarget,
    ops: Vec<DrawOp>,
    transform: Affine,
    saved: Vec<Affine>,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(target: &'a mut dyn RenderTarget) -> Self {
        Self {
            target,
            ops: Vec::new(),
            transform: Affine::IDENTITY,
            saved: Vec::new(),
        }
    }

    /// Current local-to-surface transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Replace the current transform.
    pub fn set_transform(&mut self, transform: Affine) -> &mut Self {
        self.transform = transform;
        self
    }

    /// Pre-multiply the current transform by `transform`.
    pub fn concat(&mut self, transform: Affine) -> &mut Self {
        self.transform = self.transform * transform;
        self
    }

    /// Translate subsequent drawing.
    pub fn translate(&mut self, offset: Vec2) -> &mut Self {
        self.concat(Affine::translate(offset))
    }

    /// Scale subsequent drawing.
    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.concat(Affine::scale_non_uniform(sx, sy))
    }

    /// Push the current transform.
    pub fn save(&mut self) -> &mut Self {
        self.saved.push(self.transform);
        self
    }

    /// Pop the most recently saved transform; no-op when nothing was saved.
    pub fn restore(&mut self) -> &mut Self {
        if let Some(t) = self.saved.pop() {
            self.transform = t;
        }
        self
    }

    /// Replace every pixel with `color`.
    pub fn clear(&mut self, color: Rgba8Premul) -> &mut Self {
        self.ops.push(DrawOp::Clear { color });
        self
    }

    /// Fill `rect` with `color`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> &mut Self {
        self.ops.push(DrawOp::FillRect {
            rect,
            transform: self.transform,
            color,
        });
        self
    }

    /// Fill `path` with `color` using the non-zero rule.
    pub fn fill_path(&mut self, path: &BezPath, color: Rgba8Premul) -> &mut Self {
        self.ops.push(DrawOp::FillPath {
            path: path.clone(),
            transform: self.transform,
            color,
        });
        self
    }

    /// Stroke `path` with a line of `width` local units.
    pub fn stroke_path(&mut self, path: &BezPath, width: f64, color: Rgba8Premul) -> &mut Self {
        let outline = kurbo::stroke(
            path.iter(),
            &kurbo::Stroke::new(width),
            &kurbo::StrokeOpts::default(),
            STROKE_TOLERANCE,
        );
        self.ops.push(DrawOp::FillPath {
            path: outline,
            transform: self.transform,
            color,
        });
        self
    }

    /// Draw `image` with its top-left corner at `at`.
    pub fn draw_image(&mut self, image: &Image, at: Point, opacity: f32) -> &mut Self {
        self.ops.push(DrawOp::DrawImage {
            image: image.clone(),
            transform: self.transform * Affine::translate(at.to_vec2()),
            opacity: opacity.clamp(0.0, 1.0),
        });
        self
    }

    /// Commands recorded since the last commit.
    pub fn pending_ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Replay recorded commands on the surface now, keeping the canvas usable.
    pub fn commit(&mut self) -> SurfaceResult<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.ops);
        tracing::trace!(count = ops.len(), "canvas commit");
        self.target.draw(&ops)
    }

    /// Replay recorded commands and consume the canvas, reporting any backend error.
    pub fn finish(mut self) -> SurfaceResult<()> {
        self.commit()
    }
}

impl Drop for Canvas<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            tracing::error!(error = %e, "dropping canvas with uncommitted draw commands failed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
