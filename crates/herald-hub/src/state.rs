use std::sync::{Arc, PoisonError, RwLock};

/// The process-wide current message.
///
/// Many readers may hold the lock at once; a writer excludes everyone.
/// Clones share the same value.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<String>>,
}

impl SharedState {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.into())),
        }
    }

    /// Current value. A poisoned lock still yields the last written value.
    pub fn get(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current value. No validation happens here.
    pub fn set(&self, value: impl Into<String>) {
        let value = value.into();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = value;
    }
}
