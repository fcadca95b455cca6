use super::*;
use crate::foundation::error::{SurfaceError, SurfaceResult};
use crate::pixels::format::ImageInfo;
use crate::render::target::RenderTarget;
use std::sync::Mutex;

#[derive(Default)]
struct CountingContext {
    events: Mutex<Vec<&'static str>>,
}

impl BackendContext for CountingContext {
    fn name(&self) -> &str {
        "counting"
    }

    fn lock(&self) {
        self.events.lock().unwrap().push("lock");
    }

    fn unlock(&self) {
        self.events.lock().unwrap().push("unlock");
    }

    fn create_render_target(&self, _info: &ImageInfo) -> SurfaceResult<Box<dyn RenderTarget>> {
        Err(SurfaceError::unsupported("not needed"))
    }
}

#[test]
fn guard_pairs_lock_and_unlock() {
    let ctx = CountingContext::default();
    {
        let guard = ContextGuard::acquire(Some(&ctx));
        assert!(guard.is_locked());
        assert_eq!(*ctx.events.lock().unwrap(), ["lock"]);
    }
    assert_eq!(*ctx.events.lock().unwrap(), ["lock", "unlock"]);
}

#[test]
fn guard_unlocks_on_early_error_return() {
    fn fallible(ctx: &CountingContext) -> SurfaceResult<()> {
        let _guard = ContextGuard::acquire(Some(ctx));
        Err(SurfaceError::backend("boom"))
    }

    let ctx = CountingContext::default();
    assert!(fallible(&ctx).is_err());
    assert_eq!(*ctx.events.lock().unwrap(), ["lock", "unlock"]);
}

#[test]
fn absent_context_is_a_noop() {
    let guard = ContextGuard::acquire(None);
    assert!(!guard.is_locked());
}
