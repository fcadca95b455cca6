//! Shared backend contexts and the lock discipline around them.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::IntSize;
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::format::{ColorType, ImageInfo};
use crate::render::target::RenderTarget;

pub(crate) mod guard;
pub(crate) mod lock;
pub(crate) mod settings;
pub(crate) mod software;

/// Where row zero of a render target lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Row zero is the top of the image.
    TopLeft,
    /// Row zero is the bottom of the image (GL-style textures).
    BottomLeft,
}

impl Origin {
    /// Raw value of [`Origin::TopLeft`].
    pub const RAW_TOP_LEFT: u32 = 0;
    /// Raw value of [`Origin::BottomLeft`].
    pub const RAW_BOTTOM_LEFT: u32 = 1;

    /// Decode a raw origin value. Anything but the two known values is rejected.
    pub fn from_raw(raw: u32) -> SurfaceResult<Self> {
        match raw {
            Self::RAW_TOP_LEFT => Ok(Self::TopLeft),
            Self::RAW_BOTTOM_LEFT => Ok(Self::BottomLeft),
            other => Err(SurfaceError::InvalidOrigin(other)),
        }
    }

    /// Raw value of this origin.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::TopLeft => Self::RAW_TOP_LEFT,
            Self::BottomLeft => Self::RAW_BOTTOM_LEFT,
        }
    }
}

impl TryFrom<u32> for Origin {
    type Error = SurfaceError;

    fn try_from(raw: u32) -> SurfaceResult<Self> {
        Self::from_raw(raw)
    }
}

/// Opaque identifier of a platform-native, shareable texture (the in-process analog of a
/// shared-memory surface id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlatformSurfaceHandle(u64);

impl PlatformSurfaceHandle {
    /// Allocate a handle id unique within this process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id received from elsewhere.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Backend texture created from a platform handle, not yet wrapped as a render target.
pub struct BackendTexture {
    size: IntSize,
    inner: Box<dyn Any + Send>,
}

impl BackendTexture {
    /// Wrap a backend-specific texture object of `size`.
    pub fn new(size: IntSize, inner: impl Any + Send) -> Self {
        Self {
            size,
            inner: Box::new(inner),
        }
    }

    /// Texture dimensions.
    pub fn size(&self) -> IntSize {
        self.size
    }

    /// Recover the backend-specific object; fails when the texture came from another backend.
    pub fn downcast<T: Any>(self) -> SurfaceResult<T> {
        self.inner
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| SurfaceError::backend("backend texture belongs to a different backend"))
    }
}

impl std::fmt::Debug for BackendTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendTexture")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A shared, lockable rendering device that allocates render targets for surfaces.
///
/// `lock`/`unlock` form a non-reentrant critical section that may be entered from any thread.
/// Surfaces bracket creation, content-change notification and destruction with it; see
/// [`crate::ContextGuard`].
pub trait BackendContext: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Enter the context's critical section, blocking until it is free.
    fn lock(&self);

    /// Leave the critical section entered by [`BackendContext::lock`].
    fn unlock(&self);

    /// Allocate a render target described by `info`. Called with the lock held.
    fn create_render_target(&self, info: &ImageInfo) -> SurfaceResult<Box<dyn RenderTarget>>;

    /// Create a backend texture from a platform handle. Called with the lock held.
    fn import_platform_texture(
        &self,
        handle: PlatformSurfaceHandle,
    ) -> SurfaceResult<BackendTexture> {
        let _ = handle;
        Err(SurfaceError::unsupported(format!(
            "{} context cannot import platform surfaces",
            self.name()
        )))
    }

    /// Wrap an imported texture as a render target. Called with the lock held.
    fn wrap_backend_render_target(
        &self,
        texture: BackendTexture,
        origin: Origin,
        color_type: ColorType,
    ) -> SurfaceResult<Box<dyn RenderTarget>> {
        let _ = (texture, origin, color_type);
        Err(SurfaceError::unsupported(format!(
            "{} context cannot wrap backend render targets",
            self.name()
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/origin.rs"]
mod tests;
