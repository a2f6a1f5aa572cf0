//! Configuration module for waymirror
//!
//! Configuration comes from an optional TOML file with CLI flags layered on
//! top; see `validation` for the canonicalization rules and `dates` for the
//! accepted date formats.

pub mod dates;
mod parser;
mod types;
mod validation;

pub use parser::load_config;
pub use types::{CacheConfig, Config, MemoryConfig, MirrorConfig, NetworkConfig, MAX_THREADS};
pub use validation::validate;
