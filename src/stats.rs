use serde::Serialize;

/// Hit/miss counters for one cache. Never reset while the cache lives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    hits: u64,
    misses: u64,
    write_backs: u64,
}

impl Statistics {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn write_back(&mut self) {
        self.write_backs += 1;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn write_backs(&self) -> u64 {
        self.write_backs
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Percentage of accesses that missed, `0.0` before the first access.
    pub fn miss_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            total => 100.0 * self.misses as f64 / total as f64,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        match self.accesses() {
            0 => 0.0,
            total => 100.0 * self.hits as f64 / total as f64,
        }
    }
}

/// Final report for one cache, as written to the `--json` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub policy: &'static str,
    pub cache_size: u64,
    pub line_size: u64,
    pub ways: u32,
    pub sets: u64,
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub write_backs: u64,
    pub miss_rate: f64,
    pub hit_rate: f64,
    /// Wall time spent in this cache's accesses. Filled in by the driver.
    pub elapsed_secs: f64,
}
