use crate::foundation::core::IntSize;
use crate::foundation::error::SurfaceResult;
use crate::pixels::bitmap::Bitmap;
use crate::render::image::Image;
use crate::render::ops::DrawOp;

/// What a backend may do with retained state when told content is about to change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentChangeMode {
    /// Drop cached render state; pixel content is preserved.
    Discard,
    /// Keep cached render state.
    Retain,
}

/// The backend-native surface object owned by a [`crate::Surface`].
///
/// Implementations own whatever GPU or CPU resources back the pixels. They are dropped while
/// the owning surface holds its context lock.
pub trait RenderTarget: Send {
    /// Size in pixels; fixed for the lifetime of the target.
    fn size(&self) -> IntSize;

    /// Replay `ops` in order on top of the current content.
    fn draw(&mut self, ops: &[DrawOp]) -> SurfaceResult<()>;

    /// Current content as packed premultiplied RGBA8, top row first.
    fn read_rgba8_premul(&self) -> SurfaceResult<Vec<u8>>;

    /// Replace the content from packed premultiplied RGBA8, top row first.
    fn write_rgba8_premul(&mut self, rgba: &[u8]) -> SurfaceResult<()>;

    /// Hint that the caller is about to start a new frame of drawing.
    fn notify_content_will_change(&mut self, mode: ContentChangeMode);

    /// Copy the content into `dst`, converting to its layout. Sizes are checked by the caller.
    fn read_pixels(&self, dst: &Bitmap) -> SurfaceResult<()> {
        let rgba = self.read_rgba8_premul()?;
        dst.store_rgba8_premul(&rgba)
    }

    /// Upload `src` as the new content. Sizes are checked by the caller.
    fn write_pixels(&mut self, src: &Bitmap) -> SurfaceResult<()> {
        let rgba = src.to_rgba8_premul();
        self.write_rgba8_premul(&rgba)
    }

    /// Immutable capture of the current content.
    fn snapshot(&self) -> SurfaceResult<Image> {
        Image::from_rgba8_premul(self.size(), self.read_rgba8_premul()?)
    }
}
