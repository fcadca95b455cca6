//! A painting surface that hides whether pixels live in CPU memory or on a GPU.
//!
//! A [`Surface`] is created one of three ways:
//!
//! - [`Surface::create_with_size`] without a context: a fresh [`Bitmap`] rasterized in place on
//!   the CPU (`vello_cpu`).
//! - [`Surface::create_with_size`] with a [`BackendContext`]: a render target allocated by the
//!   context ([`SoftwareContext`], or `WgpuContext` with the `gpu` feature).
//! - [`Surface::create_from_platform_handle`]: a shareable platform texture imported through a
//!   context, with an explicit [`Origin`].
//!
//! [`Surface::wrap_bitmap`] aliases a caller-owned bitmap instead of allocating one.
//!
//! Every surface then offers the same operations: draw through a [`Canvas`], transfer pixels to
//! and from bitmaps of any supported [`BitmapFormat`], take immutable [`Image`] snapshots, and
//! [`Surface::flush`] to a presentation callback.
//!
//! # Locking
//!
//! Backend contexts are shared between surfaces and threads. Creation, content-change
//! notification and destruction hold the context lock ([`ContextGuard`]) for as long as they
//! touch the backend, and release it on every exit path.
//!
//! # Pixels
//!
//! Backends work in premultiplied RGBA8. Conversion to and from a bitmap's own layout
//! (channel order, ignored alpha byte, straight alpha, row pitch) happens at the transfer
//! boundary.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod context;
mod foundation;
mod pixels;
mod render;
mod surface;

pub use crate::context::guard::ContextGuard;
pub use crate::context::settings::{
    Antialiasing, BACKEND_ENV, BackendChoice, ContextSettings, PowerPreference, create_context,
};
pub use crate::context::software::SoftwareContext;
pub use crate::context::{BackendContext, BackendTexture, Origin, PlatformSurfaceHandle};
pub use crate::foundation::core::{Affine, BezPath, IntRect, IntSize, Point, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{SurfaceError, SurfaceResult};
pub use crate::pixels::bitmap::Bitmap;
pub use crate::pixels::format::{
    AlphaType, BackendAlphaType, BitmapFormat, ColorType, ImageInfo, to_backend_alpha_type,
    to_color_type,
};
pub use crate::render::canvas::Canvas;
pub use crate::render::cpu::CpuRenderTarget;
#[cfg(feature = "gpu")]
pub use crate::render::gpu::{GpuRenderTarget, WgpuContext};
pub use crate::render::image::Image;
pub use crate::render::ops::DrawOp;
pub use crate::render::target::{ContentChangeMode, RenderTarget};
pub use crate::surface::{BackendKind, FlushCallback, Surface};
