use crate::cache::Line;

use super::Replace;

/// First in, first out: evicts the oldest install. Hits never change a
/// line's position.
pub struct Fifo;

impl Replace for Fifo {
    fn rank(line: &Line) -> u64 {
        line.insert_time
    }
}
