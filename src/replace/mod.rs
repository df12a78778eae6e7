pub mod fifo;
pub mod lfu;
pub mod lru;

use std::{fmt, str::FromStr};

use crate::{cache::Line, error::ConfigError};

use self::{fifo::Fifo, lfu::Lfu, lru::Lru};

/// Per-policy eviction metric. Among the valid lines of a set, the one with
/// the lowest rank is the victim.
pub trait Replace {
    fn rank(line: &Line) -> u64;
}

/// Replacement policy of a cache, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    Lru,
    Lfu,
    Fifo,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Lru, Policy::Lfu, Policy::Fifo];

    pub fn name(self) -> &'static str {
        match self {
            Policy::Lru => "LRU",
            Policy::Lfu => "LFU",
            Policy::Fifo => "FIFO",
        }
    }

    /// `None` sorts below every `Some`, so an invalid line outranks any
    /// stale metadata it still carries.
    fn rank(self, line: &Line) -> Option<u64> {
        if !line.valid {
            return None;
        }
        Some(match self {
            Policy::Lru => Lru::rank(line),
            Policy::Lfu => Lfu::rank(line),
            Policy::Fifo => Fifo::rank(line),
        })
    }

    /// Way to evict from `set`. Ties go to the lowest way.
    pub fn select_victim(self, set: &[Line]) -> usize {
        set.iter()
            .enumerate()
            .min_by_key(|(_way, line)| self.rank(line))
            .map_or(0, |(way, _line)| way)
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Policy::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPolicy(s.to_owned()))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(tag: u64, last_access: u64, access_count: u64, insert_time: u64) -> Line {
        Line {
            tag,
            valid: true,
            dirty: false,
            last_access,
            access_count,
            insert_time,
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("LRU".parse(), Ok(Policy::Lru));
        assert_eq!("lfu".parse(), Ok(Policy::Lfu));
        assert_eq!(" Fifo ".parse(), Ok(Policy::Fifo));
    }

    #[test]
    fn rejects_unknown_policy() {
        assert_eq!(
            "MRU".parse::<Policy>(),
            Err(ConfigError::UnknownPolicy("MRU".to_owned()))
        );
    }

    #[test]
    fn invalid_line_wins_over_any_valid_line() {
        // Stale metadata on the invalid way must not matter.
        let stale = Line {
            last_access: 1_000,
            access_count: 1_000,
            insert_time: 1_000,
            ..Line::default()
        };
        let set = [valid(1, 0, 1, 0), stale, valid(3, 0, 1, 0)];
        for policy in Policy::ALL {
            assert_eq!(policy.select_victim(&set), 1, "{policy}");
        }
    }

    #[test]
    fn first_invalid_line_is_chosen() {
        let set = [valid(1, 5, 5, 5), Line::default(), Line::default()];
        for policy in Policy::ALL {
            assert_eq!(policy.select_victim(&set), 1, "{policy}");
        }
    }

    #[test]
    fn ties_go_to_lowest_way() {
        let set = [valid(1, 7, 2, 3), valid(2, 4, 2, 3), valid(3, 4, 2, 3)];
        assert_eq!(Policy::Lru.select_victim(&set), 1);
        assert_eq!(Policy::Lfu.select_victim(&set), 0);
        assert_eq!(Policy::Fifo.select_victim(&set), 0);
    }
}
