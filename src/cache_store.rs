use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::signature::Signature;

#[derive(Error, Debug)]
pub enum CacheStoreError {
    #[error("could not serialize cache file {path}: {err}")]
    Serialize {
        path: String,
        #[source]
        err: serde_json::Error,
    },

    #[error("could not write cache file {path}: {err}")]
    Write {
        path: String,
        #[source]
        err: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub(crate) struct CacheLoadReport {
    pub loaded: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub(crate) struct CacheFlushReport {
    pub written: usize,
}

/// Persists the per-target signatures across engine invocations as one
/// JSON object (`{ target: key }`). A missing file is a fresh start and
/// unreadable contents are only worth a warning; failing to *write* the
/// file at end-of-run is fatal, because it would silently turn the next
/// run into a full rebuild.
///
#[derive(Debug)]
pub(crate) struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the prior keys and hand each one to the task that now owns the
    /// target. Entries for targets no task owns any more are dropped.
    #[tracing::instrument(name = "CacheStore::load", skip(self, ctx))]
    pub async fn load(&self, ctx: &BuildContext) -> CacheLoadReport {
        let mut report = CacheLoadReport::default();

        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cache file, starting fresh");
                return report;
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not read cache file");
                return report;
            }
        };

        let entries: serde_json::Map<String, Value> = match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not parse cache file");
                return report;
            }
        };

        for (target, key) in entries {
            match ctx.registry.owner(&target.as_str().into()) {
                Some(id) => {
                    ctx.scheduler.assign_cached_key(id, Signature::from(key));
                    report.loaded += 1;
                }
                None => report.removed += 1,
            }
        }
        report
    }

    /// Write back every surviving key: one entry per file target whose
    /// task holds a signature. Skipped-but-never-reached tasks keep their
    /// loaded key; failed tasks have none and drop out.
    #[tracing::instrument(name = "CacheStore::flush", skip(self, ctx))]
    pub async fn flush(&self, ctx: &BuildContext) -> Result<CacheFlushReport, CacheStoreError> {
        let mut entries = serde_json::Map::new();
        for (target, id) in ctx.registry.owned_targets() {
            if target.is_abstract() {
                continue;
            }
            if let Some(key) = ctx.scheduler.cached_key(id) {
                entries.insert(target.to_string(), key.as_value().clone());
            }
        }
        let report = CacheFlushReport {
            written: entries.len(),
        };

        let body = serde_json::to_vec_pretty(&Value::Object(entries)).map_err(|err| {
            CacheStoreError::Serialize {
                path: self.path.display().to_string(),
                err,
            }
        })?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|err| CacheStoreError::Write {
                path: self.path.display().to_string(),
                err,
            })?;

        debug!(path = %self.path.display(), written = report.written, "cache flushed");
        Ok(report)
    }
}
