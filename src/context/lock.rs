use std::sync::{Condvar, Mutex, PoisonError};

/// Non-reentrant lock whose acquire and release are separate calls, possibly on different
/// threads. Backs [`crate::BackendContext::lock`] for the built-in contexts.
#[derive(Debug, Default)]
pub(crate) struct ContextLock {
    locked: Mutex<bool>,
    unlocked: Condvar,
}

impl ContextLock {
    pub(crate) fn lock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        while *locked {
            locked = self
                .unlocked
                .wait(locked)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *locked = true;
    }

    pub(crate) fn unlock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(*locked, "unlock without a matching lock");
        *locked = false;
        drop(locked);
        self.unlocked.notify_one();
    }

    pub(crate) fn is_locked(&self) -> bool {
        *self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
