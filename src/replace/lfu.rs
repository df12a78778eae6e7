use crate::cache::Line;

use super::Replace;

/// Least frequently used: evicts the line with the fewest accesses since it
/// was installed. An install counts as one access.
pub struct Lfu;

impl Replace for Lfu {
    fn rank(line: &Line) -> u64 {
        line.access_count
    }
}
