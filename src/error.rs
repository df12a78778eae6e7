use std::io;

use thiserror::Error;

/// Rejected cache geometry or policy. Raised only while building a cache;
/// a cache that exists is always valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a positive integer")]
    NonPositive { field: &'static str },

    #[error("cache size {cache_size} is not a multiple of line size {line_size}")]
    SizeNotMultiple { cache_size: u64, line_size: u64 },

    #[error("{ways} ways exceed the {lines} lines in the cache")]
    TooManyWays { ways: u32, lines: u64 },

    #[error("{lines} lines cannot be split evenly into sets of {ways} ways")]
    UnevenSets { lines: u64, ways: u32 },

    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },

    #[error("unsupported replacement policy: {0}")]
    UnknownPolicy(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    #[error("bad config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad arguments: {0}")]
    Args(#[from] pico_args::Error),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
