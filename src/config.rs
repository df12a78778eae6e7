use serde::Deserialize;

use crate::{
    cache::Cache,
    error::ConfigError,
    replace::Policy,
    write_back::LogWriteBack,
};

fn default_policy() -> String {
    Policy::Lru.name().to_owned()
}

/// One cache as described on the command line or in a JSON config.
///
/// The policy stays a string until the cache is built, so an unknown name
/// surfaces as a [`ConfigError`] like every other bad parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub name: String,
    pub cache_size: u64,
    pub line_size: u64,
    pub ways: u32,
    #[serde(default = "default_policy")]
    pub policy: String,
}

/// A validated cache shape. Every field is non-zero, `line_size` and `sets`
/// are powers of two, and `sets * ways * line_size == cache_size`.
///
/// [`Geometry::new`] is the only way to get one:
///
/// ```compile_fail
/// let bogus = cachesim::Geometry {
///     cache_size: 96,
///     line_size: 16,
///     ways: 2,
///     sets: 3,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    cache_size: u64,
    line_size: u64,
    ways: u32,
    sets: u64,
}

impl Geometry {
    pub fn new(cache_size: u64, line_size: u64, ways: u32) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("cache size", cache_size),
            ("line size", line_size),
            ("ways", u64::from(ways)),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }
        if cache_size % line_size != 0 {
            return Err(ConfigError::SizeNotMultiple {
                cache_size,
                line_size,
            });
        }

        let lines = cache_size / line_size;
        if lines < u64::from(ways) {
            return Err(ConfigError::TooManyWays { ways, lines });
        }
        if lines % u64::from(ways) != 0 {
            return Err(ConfigError::UnevenSets { lines, ways });
        }

        let sets = lines / u64::from(ways);
        debug_assert!(sets >= 1);
        if !line_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "line size",
                value: line_size,
            });
        }
        if !sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "set count",
                value: sets,
            });
        }

        Ok(Geometry {
            cache_size,
            line_size,
            ways,
            sets,
        })
    }

    pub fn cache_size(&self) -> u64 {
        self.cache_size
    }

    pub fn line_size(&self) -> u64 {
        self.line_size
    }

    pub fn ways(&self) -> u32 {
        self.ways
    }

    pub fn sets(&self) -> u64 {
        self.sets
    }

    pub fn lines(&self) -> u64 {
        self.sets * u64::from(self.ways)
    }
}

impl CacheConfig {
    pub fn new(cache_size: u64, line_size: u64, ways: u32, policy: &str) -> Self {
        CacheConfig {
            name: String::new(),
            cache_size,
            line_size,
            ways,
            policy: policy.to_owned(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The configured name, or one derived from the parameters.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!(
                "{}-{}B-{}B-{}way",
                self.policy.trim().to_ascii_uppercase(),
                self.cache_size,
                self.line_size,
                self.ways
            )
        } else {
            self.name.clone()
        }
    }

    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::new(self.cache_size, self.line_size, self.ways)
    }

    pub fn policy(&self) -> Result<Policy, ConfigError> {
        self.policy.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub caches: Vec<CacheConfig>,
}

impl Config {
    pub fn single(cache: CacheConfig) -> Self {
        Config {
            caches: vec![cache],
        }
    }

    /// Builds every cache up front; the first invalid one fails the lot.
    pub fn to_caches(self) -> Result<Vec<Cache<LogWriteBack>>, ConfigError> {
        self.caches
            .into_iter()
            .map(|cc| {
                let write_back = LogWriteBack::new(cc.label());
                Cache::with_write_back(&cc, write_back)
            })
            .collect()
    }
}
