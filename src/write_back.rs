//! Hook fired when a dirty line is evicted.
//!
//! The simulator tracks only clean/dirty state, never data, so a write-back
//! is purely a side effect for the caller to observe. It is called exactly
//! once per dirty eviction, with the evicted tag, before the slot is
//! overwritten.

use tracing::trace;

pub trait WriteBack {
    fn write_back(&mut self, tag: u64);
}

/// Discards every write-back.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWriteBack;

impl WriteBack for NoWriteBack {
    fn write_back(&mut self, _tag: u64) {}
}

/// Emits a `trace` event per write-back, tagged with the cache name.
#[derive(Debug, Clone)]
pub struct LogWriteBack {
    cache: String,
}

impl LogWriteBack {
    pub fn new(cache: impl Into<String>) -> Self {
        LogWriteBack {
            cache: cache.into(),
        }
    }
}

impl WriteBack for LogWriteBack {
    fn write_back(&mut self, tag: u64) {
        trace!(cache = %self.cache, tag, "write-back");
    }
}

impl<F: FnMut(u64)> WriteBack for F {
    fn write_back(&mut self, tag: u64) {
        self(tag)
    }
}
