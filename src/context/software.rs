use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::lock::ContextLock;
use crate::context::{BackendContext, BackendTexture, Origin, PlatformSurfaceHandle};
use crate::foundation::core::IntSize;
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::bitmap::Bitmap;
use crate::pixels::format::{AlphaType, BackendAlphaType, BitmapFormat, ColorType, ImageInfo};
use crate::render::cpu::CpuRenderTarget;
use crate::render::target::RenderTarget;

/// Texture registered with [`SoftwareContext::create_shared_texture`].
struct SharedTexture {
    pixels: Arc<Bitmap>,
}

/// Backend context whose render targets are rasterized on the CPU.
///
/// It behaves like a device context: surfaces created against it go through its lock, and it
/// keeps a registry of shareable textures that stand in for platform shared-memory surfaces.
#[derive(Default)]
pub struct SoftwareContext {
    gate: ContextLock,
    shared: Mutex<HashMap<PlatformSurfaceHandle, Arc<Bitmap>>>,
}

impl SoftwareContext {
    /// New context with no shared textures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some caller currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.gate.is_locked()
    }

    /// Allocate a BGRA premultiplied texture and register it under a fresh handle.
    ///
    /// The returned bitmap is the texture's memory: writes to it are visible to every surface
    /// imported from the handle, and the other way around.
    pub fn create_shared_texture(
        &self,
        size: IntSize,
    ) -> SurfaceResult<(PlatformSurfaceHandle, Arc<Bitmap>)> {
        let pixels = Arc::new(Bitmap::new(
            BitmapFormat::Bgra8888,
            AlphaType::Premultiplied,
            size,
        )?);
        let handle = PlatformSurfaceHandle::next();
        self.registry().insert(handle, pixels.clone());
        tracing::debug!(handle = handle.raw(), %size, "shared texture registered");
        Ok((handle, pixels))
    }

    /// Forget a shared texture. Surfaces already imported from it keep their pixels alive.
    pub fn release_shared_texture(&self, handle: PlatformSurfaceHandle) -> bool {
        self.registry().remove(&handle).is_some()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<PlatformSurfaceHandle, Arc<Bitmap>>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SoftwareContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareContext")
            .field("locked", &self.is_locked())
            .field("shared_textures", &self.registry().len())
            .finish()
    }
}

impl BackendContext for SoftwareContext {
    fn name(&self) -> &str {
        "software"
    }

    fn lock(&self) {
        self.gate.lock();
    }

    fn unlock(&self) {
        self.gate.unlock();
    }

    fn create_render_target(&self, info: &ImageInfo) -> SurfaceResult<Box<dyn RenderTarget>> {
        if info.size.is_empty() {
            return Err(SurfaceError::allocation(format!(
                "cannot allocate a {} render target",
                info.size
            )));
        }
        let (format, alpha_type) = storage_layout(info.color_type, info.alpha_type);
        let storage = Bitmap::new(format, alpha_type, info.size)
            .map_err(|e| SurfaceError::allocation(e.to_string()))?;
        let target = CpuRenderTarget::new(Arc::new(storage))
            .map_err(|e| SurfaceError::allocation(e.to_string()))?;
        Ok(Box::new(target))
    }

    fn import_platform_texture(
        &self,
        handle: PlatformSurfaceHandle,
    ) -> SurfaceResult<BackendTexture> {
        let pixels = self.registry().get(&handle).cloned().ok_or_else(|| {
            SurfaceError::backend(format!("unknown platform surface {}", handle.raw()))
        })?;
        Ok(BackendTexture::new(pixels.size(), SharedTexture { pixels }))
    }

    fn wrap_backend_render_target(
        &self,
        texture: BackendTexture,
        origin: Origin,
        color_type: ColorType,
    ) -> SurfaceResult<Box<dyn RenderTarget>> {
        let SharedTexture { pixels } = texture.downcast::<SharedTexture>()?;
        let native = crate::pixels::format::to_color_type(pixels.format());
        if native != color_type {
            return Err(SurfaceError::unsupported(format!(
                "shared texture is {native:?}, cannot wrap as {color_type:?}"
            )));
        }
        Ok(Box::new(CpuRenderTarget::with_origin(pixels, origin)?))
    }
}

/// Bitmap layout backing a render target of the given backend types.
fn storage_layout(color_type: ColorType, alpha_type: BackendAlphaType) -> (BitmapFormat, AlphaType) {
    let opaque = alpha_type == BackendAlphaType::Opaque;
    let format = match (color_type, opaque) {
        (ColorType::Bgra8888, false) => BitmapFormat::Bgra8888,
        (ColorType::Bgra8888, true) => BitmapFormat::Bgrx8888,
        (ColorType::Rgba8888, false) => BitmapFormat::Rgba8888,
        (ColorType::Rgba8888, true) | (ColorType::Rgb888x, _) => BitmapFormat::Rgbx8888,
    };
    let alpha_type = match alpha_type {
        BackendAlphaType::Unpremul => AlphaType::Unpremultiplied,
        BackendAlphaType::Opaque | BackendAlphaType::Premul => AlphaType::Premultiplied,
    };
    (format, alpha_type)
}

#[cfg(test)]
#[path = "../../tests/unit/context/software.rs"]
mod tests;
