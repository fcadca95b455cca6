use std::sync::Arc;

use crate::context::guard::ContextGuard;
use crate::context::{BackendContext, Origin, PlatformSurfaceHandle};
use crate::foundation::core::{IntRect, IntSize};
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::bitmap::Bitmap;
use crate::pixels::format::{
    AlphaType, BackendAlphaType, BitmapFormat, ColorType, ImageInfo, to_backend_alpha_type,
    to_color_type,
};
use crate::render::canvas::Canvas;
use crate::render::cpu::CpuRenderTarget;
use crate::render::image::Image;
use crate::render::target::{ContentChangeMode, RenderTarget};

/// Callback run by [`Surface::flush`], typically to present the frame.
pub type FlushCallback = Box<dyn FnMut() + Send>;

/// Where a surface's pixels live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A CPU bitmap, rendered in place.
    Cpu,
    /// A render target allocated by a backend context.
    Gpu,
    /// A platform-native texture imported through a backend context.
    ImportedPlatform,
}

/// Holds the context for teardown and releases its lock when dropped.
struct TeardownLock {
    context: Option<Arc<dyn BackendContext>>,
    locked: bool,
}

impl TeardownLock {
    fn lock(&mut self) {
        if let Some(ctx) = &self.context {
            tracing::trace!(backend = ctx.name(), "context lock");
            ctx.lock();
            self.locked = true;
        }
    }
}

impl Drop for TeardownLock {
    fn drop(&mut self) {
        if let (true, Some(ctx)) = (self.locked, &self.context) {
            ctx.unlock();
            tracing::trace!(backend = ctx.name(), "context unlock");
        }
    }
}

/// A paintable surface backed by a CPU bitmap, a context-allocated render target, or an
/// imported platform texture.
///
/// Creation, [`Surface::notify_content_will_change`] and destruction hold the backend
/// context's lock while touching the backend. Pixel transfer, drawing and snapshots do not.
pub struct Surface {
    // Field order matters: `target` drops before `teardown`, which releases the lock taken in
    // `Drop for Surface`. Everything after `teardown` drops unlocked, so a flush callback may
    // own other surfaces on the same context.
    target: Box<dyn RenderTarget>,
    teardown: TeardownLock,
    bitmap: Option<Arc<Bitmap>>,
    on_flush: Option<FlushCallback>,
    size: IntSize,
    backend_kind: BackendKind,
    color_type: ColorType,
    alpha_type: BackendAlphaType,
}

impl Surface {
    /// Create a surface of `size`.
    ///
    /// Without a context the pixels live in a fresh [`Bitmap`] of `format` that the CPU
    /// rasterizer renders into directly. With one, the render target is allocated by the context
    /// under its lock.
    #[tracing::instrument(level = "debug", skip(context), fields(backend = context.as_ref().map_or("cpu", |c| c.name())))]
    pub fn create_with_size(
        context: Option<Arc<dyn BackendContext>>,
        size: IntSize,
        format: BitmapFormat,
        alpha_type: AlphaType,
    ) -> SurfaceResult<Self> {
        if size.is_empty() {
            return Err(SurfaceError::allocation(format!(
                "cannot create a {size} surface"
            )));
        }
        let info = ImageInfo::new(size, format, alpha_type);

        let Some(context) = context else {
            let bitmap = Arc::new(
                Bitmap::new(format, alpha_type, size)
                    .map_err(|e| SurfaceError::allocation(e.to_string()))?,
            );
            let target = CpuRenderTarget::new(bitmap.clone())
                .map_err(|e| SurfaceError::allocation(e.to_string()))?;
            tracing::debug!(%size, ?format, "cpu surface created");
            return Ok(Self::assemble(
                Box::new(target),
                Some(bitmap),
                None,
                BackendKind::Cpu,
                info.color_type,
                info.alpha_type,
            ));
        };

        let target = {
            let _guard = ContextGuard::acquire(Some(context.as_ref()));
            let target = context.create_render_target(&info)?;
            check_target_size(target.as_ref(), size)?;
            target
        };
        tracing::debug!(%size, ?format, backend = context.name(), "gpu surface created");
        Ok(Self::assemble(
            target,
            None,
            Some(context),
            BackendKind::Gpu,
            info.color_type,
            info.alpha_type,
        ))
    }

    /// Wrap a caller-owned bitmap without copying. Drawing on the surface writes the bitmap's
    /// bytes, and writes to the bitmap show up in the surface.
    #[tracing::instrument(level = "debug", skip(bitmap), fields(size = %bitmap.size()))]
    pub fn wrap_bitmap(bitmap: Arc<Bitmap>) -> SurfaceResult<Self> {
        let target = CpuRenderTarget::new(bitmap.clone())?;
        let color_type = to_color_type(bitmap.format());
        let alpha_type = to_backend_alpha_type(bitmap.format(), bitmap.alpha_type());
        Ok(Self::assemble(
            Box::new(target),
            Some(bitmap),
            None,
            BackendKind::Cpu,
            color_type,
            alpha_type,
        ))
    }

    /// Import a platform-native texture through `context`.
    ///
    /// The size comes from the texture itself; pixels are interpreted as premultiplied BGRA with
    /// row zero at `origin`. The context lock is held for the whole import and released on every
    /// exit path.
    #[tracing::instrument(level = "debug", skip(context), fields(backend = context.name()))]
    pub fn create_from_platform_handle(
        handle: PlatformSurfaceHandle,
        context: Arc<dyn BackendContext>,
        origin: Origin,
    ) -> SurfaceResult<Self> {
        let color_type = ColorType::Bgra8888;
        let target = {
            let _guard = ContextGuard::acquire(Some(context.as_ref()));
            let texture = context.import_platform_texture(handle)?;
            let size = texture.size();
            let target = context.wrap_backend_render_target(texture, origin, color_type)?;
            check_target_size(target.as_ref(), size)?;
            target
        };
        tracing::debug!(size = %target.size(), ?origin, "platform surface imported");
        Ok(Self::assemble(
            target,
            None,
            Some(context),
            BackendKind::ImportedPlatform,
            color_type,
            BackendAlphaType::Premul,
        ))
    }

    fn assemble(
        target: Box<dyn RenderTarget>,
        bitmap: Option<Arc<Bitmap>>,
        context: Option<Arc<dyn BackendContext>>,
        backend_kind: BackendKind,
        color_type: ColorType,
        alpha_type: BackendAlphaType,
    ) -> Self {
        Self {
            size: target.size(),
            target,
            bitmap,
            on_flush: None,
            backend_kind,
            color_type,
            alpha_type,
            teardown: TeardownLock {
                context,
                locked: false,
            },
        }
    }

    /// Size in pixels; never changes.
    pub fn size(&self) -> IntSize {
        self.size
    }

    /// `(0, 0, width, height)`.
    pub fn rect(&self) -> IntRect {
        IntRect::from_size(self.size)
    }

    /// Backend the pixels live in.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    /// Backend color type chosen at creation.
    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    /// Backend alpha type chosen at creation.
    pub fn alpha_type(&self) -> BackendAlphaType {
        self.alpha_type
    }

    /// The bitmap holding the pixels of a CPU surface.
    pub fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        self.bitmap.as_ref()
    }

    /// The shared backend context, absent for CPU surfaces.
    pub fn context(&self) -> Option<&Arc<dyn BackendContext>> {
        self.teardown.context.as_ref()
    }

    /// The backend render target.
    pub fn render_target(&self) -> &dyn RenderTarget {
        self.target.as_ref()
    }

    /// The backend render target, mutably.
    pub fn render_target_mut(&mut self) -> &mut dyn RenderTarget {
        self.target.as_mut()
    }

    /// Tell the backend a new frame of drawing is about to start. Retained render state may be
    /// discarded; pixel content is unchanged.
    pub fn notify_content_will_change(&mut self) {
        let _guard = ContextGuard::acquire(self.teardown.context.as_deref());
        self.target
            .notify_content_will_change(ContentChangeMode::Discard);
    }

    /// Copy the surface content into `bitmap`, converted to the bitmap's format.
    pub fn read_into_bitmap(&self, bitmap: &Bitmap) -> SurfaceResult<()> {
        self.check_transfer_size(bitmap)?;
        tracing::trace!(size = %self.size, format = ?bitmap.format(), "read pixels");
        self.target.read_pixels(bitmap)
    }

    /// Replace the surface content with `bitmap`, converted from the bitmap's format.
    pub fn write_from_bitmap(&mut self, bitmap: &Bitmap) -> SurfaceResult<()> {
        self.check_transfer_size(bitmap)?;
        tracing::trace!(size = %self.size, format = ?bitmap.format(), "write pixels");
        self.target.write_pixels(bitmap)
    }

    fn check_transfer_size(&self, bitmap: &Bitmap) -> SurfaceResult<()> {
        if bitmap.size() != self.size {
            return Err(SurfaceError::SizeMismatch {
                surface: self.size,
                bitmap: bitmap.size(),
            });
        }
        Ok(())
    }

    /// Drawing target for this surface. Commands land when the canvas finishes or drops.
    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas::new(self.target.as_mut())
    }

    /// Immutable capture of the current content.
    pub fn image_snapshot(&self) -> SurfaceResult<Image> {
        self.target.snapshot()
    }

    /// Register the callback run by [`Surface::flush`], replacing any previous one.
    pub fn set_on_flush(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_flush = Some(Box::new(callback));
    }

    /// Remove the flush callback, returning it.
    pub fn clear_on_flush(&mut self) -> Option<FlushCallback> {
        self.on_flush.take()
    }

    /// Run the flush callback if one is registered.
    pub fn flush(&mut self) {
        if let Some(on_flush) = self.on_flush.as_mut() {
            on_flush();
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        tracing::debug!(size = %self.size, kind = ?self.backend_kind, "surface destroyed");
        // Unlocked by `teardown` after `target` has been released.
        self.teardown.lock();
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("size", &self.size)
            .field("backend_kind", &self.backend_kind)
            .field("color_type", &self.color_type)
            .field("alpha_type", &self.alpha_type)
            .field("context", &self.context().map(|c| c.name()))
            .field("has_on_flush", &self.on_flush.is_some())
            .finish_non_exhaustive()
    }
}

fn check_target_size(target: &dyn RenderTarget, expected: IntSize) -> SurfaceResult<()> {
    if target.size() != expected {
        return Err(SurfaceError::backend(format!(
            "backend produced a {} target, expected {expected}",
            target.size()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/surface/surface.rs"]
mod tests;
