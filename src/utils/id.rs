use std::sync::atomic::{AtomicU64, Ordering};

/// Counter that returns unique IDs.
pub struct IdCounter {
    value: AtomicU64,
}

impl IdCounter {
    pub const fn new() -> Self {
        Self {
            // Zero is reserved for the root node.
            value: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IdCounter")
            .field(&self.value.load(Ordering::Relaxed))
            .finish()
    }
}
