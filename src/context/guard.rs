use crate::context::BackendContext;

/// Scoped hold on a [`BackendContext`]'s lock.
///
/// Acquiring with `None` is a no-op, which is how CPU-only surfaces skip locking. The lock is
/// released exactly once when the guard drops, including on early return and unwinding.
#[must_use = "the context is unlocked as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    context: Option<&'a dyn BackendContext>,
}

impl<'a> ContextGuard<'a> {
    /// Lock `context` if present.
    pub fn acquire(context: Option<&'a dyn BackendContext>) -> Self {
        if let Some(ctx) = context {
            tracing::trace!(backend = ctx.name(), "context lock");
            ctx.lock();
        }
        Self { context }
    }

    /// Whether a context lock is actually held.
    pub fn is_locked(&self) -> bool {
        self.context.is_some()
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.context.take() {
            ctx.unlock();
            tracing::trace!(backend = ctx.name(), "context unlock");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/guard.rs"]
mod tests;
