use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide count of connections currently being handled.
#[derive(Debug, Clone, Default)]
pub struct ConnectionCounter {
    active: Arc<AtomicUsize>,
}

impl ConnectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a connection in until the returned guard is dropped.
    pub fn enter(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the counter on drop, whichever way handling ended.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
