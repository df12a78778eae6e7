use crate::cache::Line;

use super::Replace;

/// Least recently used: evicts the line whose last hit or install is oldest.
pub struct Lru;

impl Replace for Lru {
    fn rank(line: &Line) -> u64 {
        line.last_access
    }
}
