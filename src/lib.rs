//! A small, parallel, content-addressed build engine.
//!
//! A driver describes a build as a graph of tasks producing *targets*
//! (files, or `:`-prefixed abstract labels) from prerequisites; [`Maek`]
//! updates a requested set of targets with bounded child-process
//! parallelism, skipping any task whose content signature is unchanged
//! since the last successful run.

mod cache_store;
mod command_runner;
mod context;
mod engine;
mod errors;
mod hash_cache;
mod job_pool;
mod options;
mod platform;
mod registry;
mod rules;
mod scheduler;
mod signature;
mod target;
mod task;

pub use cache_store::CacheStoreError;
pub use engine::{Maek, MaekOptions};
pub use errors::{BuildError, ConfigError};
pub use options::RuleOptions;
pub use platform::Platform;
pub use target::Target;
