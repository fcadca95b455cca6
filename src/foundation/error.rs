use crate::foundation::core::IntSize;

/// Convenience result type used across the crate.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Top-level error taxonomy for surface creation, transfer and backend failures.
#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    /// A backend could not produce a surface or render target.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// Pixel transfer between a surface and a bitmap of a different size.
    #[error("size mismatch: surface is {surface}, bitmap is {bitmap}")]
    SizeMismatch {
        /// Size of the surface.
        surface: IntSize,
        /// Size of the bitmap passed to the transfer.
        bitmap: IntSize,
    },

    /// A raw surface origin value outside the supported set.
    #[error("invalid surface origin: {0}")]
    InvalidOrigin(u32),

    /// The context or platform does not provide the requested capability.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failures reported by the rendering backend itself.
    #[error("backend error: {0}")]
    Backend(String),

    /// Invalid user-provided data (sizes, pitches, buffer lengths, settings).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SurfaceError {
    /// Build a [`SurfaceError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`SurfaceError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`SurfaceError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`SurfaceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
