use std::{iter, ops::Range};

use tracing::debug;

use crate::{
    config::{CacheConfig, Geometry},
    error::ConfigError,
    replace::Policy,
    stats::{CacheStats, Statistics},
    trace::AccessKind,
    write_back::{NoWriteBack, WriteBack},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: u64,
    pub set: usize,
    pub tag: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    fn apply(&self, num: u64) -> u64 {
        (num >> self.shift) & self.mask
    }
}

/// Splits an address into tag, set index and block offset.
///
/// Any `u64` decodes; the bits above the index simply become the tag.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
}

impl AddressDecoder {
    pub fn new(line_size: u64, n_sets: u64) -> Self {
        debug_assert!(line_size.is_power_of_two());
        debug_assert!(n_sets.is_power_of_two());

        let set_shift = line_size.ilog2();
        let tag_shift = n_sets.ilog2() + set_shift;
        AddressDecoder {
            offset_sec: BitSection {
                shift: 0,
                mask: line_size - 1,
            },
            set_sec: BitSection {
                shift: set_shift,
                mask: n_sets - 1,
            },
            tag_sec: BitSection {
                shift: tag_shift,
                mask: !0,
            },
        }
    }

    pub fn decode(&self, address: u64) -> Addr {
        Addr {
            offset: self.offset_sec.apply(address),
            set: self.set_sec.apply(address) as usize,
            tag: self.tag_sec.apply(address),
        }
    }
}

/// One way of one set.
///
/// `last_access` and `insert_time` come from the cache's two sequence
/// counters; metadata on an invalid line is stale and ignored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,
    pub last_access: u64,
    pub access_count: u64,
    pub insert_time: u64,
}

impl Line {
    fn touch(&mut self, access_seq: u64, kind: AccessKind) {
        self.last_access = access_seq;
        self.access_count += 1;
        if kind == AccessKind::Write {
            self.dirty = true;
        }
    }

    fn install(&mut self, tag: u64, access_seq: u64, insert_seq: u64, kind: AccessKind) {
        self.tag = tag;
        self.valid = true;
        self.last_access = access_seq;
        self.access_count = 1;
        self.insert_time = insert_seq;
        self.dirty = kind == AccessKind::Write;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}

/// Set-associative cache driven one access at a time.
///
/// Calls to [`Cache::access`] must be serialized by the caller: the outcome
/// depends on trace order, so the cache does no locking of its own.
#[derive(Debug)]
pub struct Cache<W: WriteBack = NoWriteBack> {
    name: String,
    lines: Vec<Line>,
    geometry: Geometry,
    decoder: AddressDecoder,
    policy: Policy,
    write_back: W,
    stats: Statistics,
    access_seq: u64,
    insert_seq: u64,
}

impl Cache<NoWriteBack> {
    /// A cache with no write-back hook.
    pub fn new(
        cache_size: u64,
        line_size: u64,
        ways: u32,
        policy: &str,
    ) -> Result<Self, ConfigError> {
        Cache::with_write_back(
            &CacheConfig::new(cache_size, line_size, ways, policy),
            NoWriteBack,
        )
    }
}

impl<W: WriteBack> Cache<W> {
    pub fn with_write_back(config: &CacheConfig, write_back: W) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let policy = config.policy()?;
        Ok(Cache::from_parts(config.label(), geometry, policy, write_back))
    }

    pub fn from_parts(name: String, geometry: Geometry, policy: Policy, write_back: W) -> Self {
        debug!(
            cache = %name,
            size = geometry.cache_size(),
            line = geometry.line_size(),
            ways = geometry.ways(),
            sets = geometry.sets(),
            %policy,
            "cache constructed"
        );
        Cache {
            name,
            lines: iter::repeat(Line::default())
                .take(geometry.lines() as usize)
                .collect(),
            decoder: AddressDecoder::new(geometry.line_size(), geometry.sets()),
            geometry,
            policy,
            write_back,
            stats: Statistics::default(),
            access_seq: 0,
            insert_seq: 0,
        }
    }

    /// Looks `address` up, filling its line on a miss. A dirty victim is
    /// handed to the write-back hook before it is overwritten.
    pub fn access(&mut self, address: u64, kind: AccessKind) -> AccessResult {
        let addr = self.split_addr(address);
        let set_range = self.get_set(addr.set);
        let set_slice = &mut self.lines[set_range];

        let access_seq = self.access_seq;
        self.access_seq += 1;

        // First, look for a hit
        if let Some(line) = set_slice
            .iter_mut()
            .find(|l| l.valid && l.tag == addr.tag)
        {
            line.touch(access_seq, kind);
            self.stats.hit();
            return AccessResult::Hit;
        }

        self.stats.miss();
        let victim_way = self.policy.select_victim(set_slice);
        let victim = &mut set_slice[victim_way];
        if victim.valid && victim.dirty {
            self.write_back.write_back(victim.tag);
            self.stats.write_back();
        }

        let insert_seq = self.insert_seq;
        self.insert_seq += 1;
        victim.install(addr.tag, access_seq, insert_seq, kind);

        AccessResult::Miss
    }

    pub fn split_addr(&self, address: u64) -> Addr {
        self.decoder.decode(address)
    }

    fn get_set(&self, set: usize) -> Range<usize> {
        let n_ways = self.geometry.ways() as usize;
        set * n_ways..(set + 1) * n_ways
    }

    /// The ways of set `index`, lowest way first.
    pub fn set(&self, index: usize) -> &[Line] {
        &self.lines[self.get_set(index)]
    }

    pub fn miss_rate(&self) -> f64 {
        self.stats.miss_rate()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn write_back_hook(&self) -> &W {
        &self.write_back
    }

    pub fn make_stats(&self) -> CacheStats {
        CacheStats {
            name: self.name.clone(),
            policy: self.policy.name(),
            cache_size: self.geometry.cache_size(),
            line_size: self.geometry.line_size(),
            ways: self.geometry.ways(),
            sets: self.geometry.sets(),
            accesses: self.stats.accesses(),
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            write_backs: self.stats.write_backs(),
            miss_rate: self.stats.miss_rate(),
            hit_rate: self.stats.hit_rate(),
            elapsed_secs: 0.0,
        }
    }
}
