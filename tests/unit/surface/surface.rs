use super::*;
use crate::context::BackendTexture;
use crate::foundation::core::Rgba8Premul;
use crate::render::ops::DrawOp;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

struct MockTarget {
    size: IntSize,
    log: Log,
    pixels: Vec<u8>,
}

impl RenderTarget for MockTarget {
    fn size(&self) -> IntSize {
        self.size
    }

    fn draw(&mut self, ops: &[DrawOp]) -> SurfaceResult<()> {
        push(&self.log, format!("draw {}", ops.len()));
        Ok(())
    }

    fn read_rgba8_premul(&self) -> SurfaceResult<Vec<u8>> {
        Ok(self.pixels.clone())
    }

    fn write_rgba8_premul(&mut self, rgba: &[u8]) -> SurfaceResult<()> {
        self.pixels = rgba.to_vec();
        Ok(())
    }

    fn notify_content_will_change(&mut self, mode: ContentChangeMode) {
        push(&self.log, format!("notify {mode:?}"));
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        push(&self.log, "release");
    }
}

struct MockContext {
    log: Log,
    held: Mutex<bool>,
    importable: bool,
    /// Size reported for imported textures.
    texture_size: IntSize,
    fail_create: bool,
    fail_wrap: bool,
    /// Hand back targets one pixel wider than asked for.
    wrong_size: bool,
}

impl MockContext {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            held: Mutex::new(false),
            importable: false,
            texture_size: IntSize::new(6, 3),
            fail_create: false,
            fail_wrap: false,
            wrong_size: false,
        }
    }

    fn target(&self, size: IntSize) -> Box<dyn RenderTarget> {
        let size = if self.wrong_size {
            IntSize::new(size.width + 1, size.height)
        } else {
            size
        };
        Box::new(MockTarget {
            size,
            log: self.log.clone(),
            pixels: vec![0; size.area() * 4],
        })
    }
}

impl BackendContext for MockContext {
    fn name(&self) -> &str {
        "mock"
    }

    fn lock(&self) {
        let mut held = self.held.lock().unwrap();
        assert!(!*held, "nested lock");
        *held = true;
        push(&self.log, "lock");
    }

    fn unlock(&self) {
        let mut held = self.held.lock().unwrap();
        assert!(*held, "unlock without lock");
        *held = false;
        push(&self.log, "unlock");
    }

    fn create_render_target(&self, info: &ImageInfo) -> SurfaceResult<Box<dyn RenderTarget>> {
        assert!(*self.held.lock().unwrap(), "allocation outside the lock");
        if self.fail_create {
            return Err(SurfaceError::allocation("out of texture memory"));
        }
        push(&self.log, "create");
        Ok(self.target(info.size))
    }

    fn import_platform_texture(
        &self,
        handle: PlatformSurfaceHandle,
    ) -> SurfaceResult<BackendTexture> {
        assert!(*self.held.lock().unwrap(), "import outside the lock");
        if !self.importable {
            return Err(SurfaceError::unsupported("mock import disabled"));
        }
        push(&self.log, format!("import {}", handle.raw()));
        Ok(BackendTexture::new(self.texture_size, handle))
    }

    fn wrap_backend_render_target(
        &self,
        texture: BackendTexture,
        origin: Origin,
        color_type: ColorType,
    ) -> SurfaceResult<Box<dyn RenderTarget>> {
        assert!(*self.held.lock().unwrap(), "wrap outside the lock");
        if self.fail_wrap {
            return Err(SurfaceError::backend("texture cannot be wrapped"));
        }
        push(&self.log, format!("wrap {origin:?} {color_type:?}"));
        Ok(self.target(texture.size()))
    }
}

fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn gpu_surface(log: &Log) -> Surface {
    let ctx: Arc<dyn BackendContext> = Arc::new(MockContext::new(log));
    Surface::create_with_size(
        Some(ctx),
        IntSize::new(4, 2),
        BitmapFormat::Bgra8888,
        AlphaType::Premultiplied,
    )
    .unwrap()
}

#[test]
fn context_surface_pairs_lock_and_unlock_through_lifecycle() {
    let log = Log::default();
    let mut surface = gpu_surface(&log);
    assert_eq!(surface.backend_kind(), BackendKind::Gpu);
    assert_eq!(surface.color_type(), ColorType::Bgra8888);
    assert_eq!(surface.alpha_type(), BackendAlphaType::Premul);
    assert!(surface.bitmap().is_none());
    assert_eq!(surface.context().map(|c| c.name()), Some("mock"));

    surface.notify_content_will_change();
    drop(surface);

    assert_eq!(
        events(&log),
        [
            "lock",
            "create",
            "unlock",
            "lock",
            "notify Discard",
            "unlock",
            "lock",
            "release",
            "unlock"
        ]
    );
}

#[test]
fn transfer_and_drawing_do_not_lock() {
    let log = Log::default();
    let mut surface = gpu_surface(&log);
    log.lock().unwrap().clear();

    let bitmap = Bitmap::new(BitmapFormat::Rgba8888, AlphaType::Premultiplied, IntSize::new(4, 2))
        .unwrap();
    surface.write_from_bitmap(&bitmap).unwrap();
    surface.read_into_bitmap(&bitmap).unwrap();
    surface
        .canvas()
        .clear(Rgba8Premul::transparent())
        .commit()
        .unwrap();
    surface.image_snapshot().unwrap();

    assert_eq!(events(&log), ["draw 1"]);
}

#[test]
fn failed_allocation_is_an_error_with_lock_released() {
    let log = Log::default();
    let ctx = Arc::new(MockContext {
        fail_create: true,
        ..MockContext::new(&log)
    });
    let shared: Arc<dyn BackendContext> = ctx.clone();
    let err = Surface::create_with_size(
        Some(shared),
        IntSize::new(4, 4),
        BitmapFormat::Rgba8888,
        AlphaType::Premultiplied,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Allocation(_)));
    assert_eq!(events(&log), ["lock", "unlock"]);
    assert!(!*ctx.held.lock().unwrap());
}

#[test]
fn import_takes_size_from_texture_and_wraps_as_bgra() {
    let log = Log::default();
    let ctx = Arc::new(MockContext {
        importable: true,
        ..MockContext::new(&log)
    });
    let handle = PlatformSurfaceHandle::from_raw(7);
    let surface =
        Surface::create_from_platform_handle(handle, ctx, Origin::BottomLeft).unwrap();
    assert_eq!(surface.size(), IntSize::new(6, 3));
    assert_eq!(surface.backend_kind(), BackendKind::ImportedPlatform);
    assert_eq!(surface.color_type(), ColorType::Bgra8888);
    drop(surface);

    assert_eq!(
        events(&log),
        [
            "lock",
            "import 7",
            "wrap BottomLeft Bgra8888",
            "unlock",
            "lock",
            "release",
            "unlock"
        ]
    );
}

#[test]
fn unsupported_import_releases_the_lock() {
    let log = Log::default();
    let ctx = Arc::new(MockContext::new(&log));
    let err = Surface::create_from_platform_handle(
        PlatformSurfaceHandle::from_raw(1),
        ctx.clone(),
        Origin::TopLeft,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Unsupported(_)));
    assert_eq!(events(&log), ["lock", "unlock"]);
}

#[test]
fn failed_wrap_after_import_releases_the_lock() {
    let log = Log::default();
    let ctx = Arc::new(MockContext {
        importable: true,
        fail_wrap: true,
        ..MockContext::new(&log)
    });
    let err = Surface::create_from_platform_handle(
        PlatformSurfaceHandle::from_raw(3),
        ctx.clone(),
        Origin::TopLeft,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Backend(_)));
    assert_eq!(events(&log), ["lock", "import 3", "unlock"]);
    assert!(!*ctx.held.lock().unwrap());
}

#[test]
fn wrongly_sized_import_is_released_under_the_lock() {
    let log = Log::default();
    let ctx = Arc::new(MockContext {
        importable: true,
        wrong_size: true,
        ..MockContext::new(&log)
    });
    let err = Surface::create_from_platform_handle(
        PlatformSurfaceHandle::from_raw(3),
        ctx.clone(),
        Origin::TopLeft,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Backend(_)));
    assert_eq!(
        events(&log),
        ["lock", "import 3", "wrap TopLeft Bgra8888", "release", "unlock"]
    );
}

#[test]
fn wrongly_sized_allocation_is_released_under_the_lock() {
    let log = Log::default();
    let ctx: Arc<dyn BackendContext> = Arc::new(MockContext {
        wrong_size: true,
        ..MockContext::new(&log)
    });
    let err = Surface::create_with_size(
        Some(ctx),
        IntSize::new(4, 4),
        BitmapFormat::Rgba8888,
        AlphaType::Premultiplied,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Backend(_)));
    assert_eq!(events(&log), ["lock", "create", "release", "unlock"]);
}

#[test]
fn flush_callback_owning_a_sibling_surface_drops_unlocked() {
    let log = Log::default();
    let ctx: Arc<dyn BackendContext> = Arc::new(MockContext::new(&log));
    let create = || {
        Surface::create_with_size(
            Some(ctx.clone()),
            IntSize::new(2, 2),
            BitmapFormat::Bgra8888,
            AlphaType::Premultiplied,
        )
        .unwrap()
    };
    let mut front = create();
    let back = create();
    front.set_on_flush(move || {
        let _ = back.size();
    });
    log.lock().unwrap().clear();

    drop(front);
    assert_eq!(
        events(&log),
        ["lock", "release", "unlock", "lock", "release", "unlock"]
    );
}

#[test]
fn cpu_surface_never_locks_and_exposes_its_bitmap() {
    let mut surface = Surface::create_with_size(
        None,
        IntSize::new(3, 3),
        BitmapFormat::Rgbx8888,
        AlphaType::Premultiplied,
    )
    .unwrap();
    assert_eq!(surface.backend_kind(), BackendKind::Cpu);
    assert_eq!(surface.color_type(), ColorType::Rgb888x);
    assert_eq!(surface.alpha_type(), BackendAlphaType::Opaque);
    assert!(surface.context().is_none());
    assert_eq!(surface.bitmap().map(|b| b.size()), Some(IntSize::new(3, 3)));
    surface.notify_content_will_change();
}

#[test]
fn empty_size_is_rejected() {
    let err = Surface::create_with_size(
        None,
        IntSize::new(0, 5),
        BitmapFormat::Rgba8888,
        AlphaType::Premultiplied,
    )
    .unwrap_err();
    assert!(matches!(err, SurfaceError::Allocation(_)));
}

#[test]
fn mismatched_transfer_sizes_are_reported() {
    let mut surface = Surface::create_with_size(
        None,
        IntSize::new(4, 4),
        BitmapFormat::Rgba8888,
        AlphaType::Premultiplied,
    )
    .unwrap();
    let small = Bitmap::new(BitmapFormat::Rgba8888, AlphaType::Premultiplied, IntSize::new(4, 3))
        .unwrap();
    small.set_pixel(0, 0, [1, 2, 3, 255]).unwrap();

    match surface.write_from_bitmap(&small) {
        Err(SurfaceError::SizeMismatch { surface: s, bitmap: b }) => {
            assert_eq!(s, IntSize::new(4, 4));
            assert_eq!(b, IntSize::new(4, 3));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        surface.read_into_bitmap(&small),
        Err(SurfaceError::SizeMismatch { .. })
    ));
    assert_eq!(small.get_pixel(0, 0), Some([1, 2, 3, 255]));
    assert_eq!(surface.image_snapshot().unwrap().pixel(0, 0), Some(Rgba8Premul::transparent()));
}

#[test]
fn flush_runs_the_callback_once_per_call() {
    let mut surface = Surface::create_with_size(
        None,
        IntSize::new(1, 1),
        BitmapFormat::Rgba8888,
        AlphaType::Premultiplied,
    )
    .unwrap();
    surface.flush();

    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    surface.set_on_flush(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    surface.flush();
    surface.flush();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    assert!(surface.clear_on_flush().is_some());
    surface.flush();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn surface_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Surface>();
}
