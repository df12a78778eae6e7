//! Trace-driven simulator for a single level of set-associative cache.
//!
//! A [`Cache`] is built from a validated geometry and a replacement
//! [`Policy`], then fed `(address, kind)` pairs one at a time through
//! [`Cache::access`]. Hit, miss and write-back counts accumulate in its
//! [`Statistics`].

pub mod cache;
pub mod config;
pub mod error;
pub mod replace;
pub mod stats;
pub mod trace;
pub mod write_back;

pub use cache::{AccessResult, Cache};
pub use config::{CacheConfig, Config, Geometry};
pub use error::{ConfigError, Error};
pub use replace::Policy;
pub use stats::{CacheStats, Statistics};
pub use trace::{AccessKind, Record};
pub use write_back::{LogWriteBack, NoWriteBack, WriteBack};
