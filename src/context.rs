use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::command_runner::CommandRunner;
use crate::errors::BuildError;
use crate::hash_cache::HashCache;
use crate::job_pool::JobPool;
use crate::platform::Platform;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::target::Target;

/// Cheap cloneable handle over the engine's shared state. One of these is
/// threaded through every task's `run` and `key`, so rules can recurse
/// into the scheduler, hash inputs, and spawn commands without owning any
/// of the machinery.
///
#[derive(Clone)]
pub(crate) struct BuildContext {
    pub(crate) platform: Platform,
    pub(crate) root: Arc<PathBuf>,
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) hash_cache: Arc<HashCache>,
    pub(crate) runner: Arc<CommandRunner>,
    pub(crate) stats: Arc<BuildStats>,
}

impl BuildContext {
    pub fn new(platform: Platform, root: PathBuf, jobs: usize) -> Self {
        Self {
            platform,
            root: Arc::new(root),
            registry: Arc::new(TaskRegistry::new()),
            scheduler: Arc::new(Scheduler::new()),
            hash_cache: Arc::new(HashCache::new()),
            runner: Arc::new(CommandRunner::new(Arc::new(JobPool::new(jobs)))),
            stats: Arc::new(BuildStats::default()),
        }
    }

    pub fn resolve(&self, target: &Target) -> PathBuf {
        target.resolve_against(&self.root)
    }

    pub async fn run_command(&self, argv: &[String], message: &str) -> Result<(), BuildError> {
        self.runner.run(&self.root, argv, message).await
    }

    pub async fn hash_files(&self, targets: &[Target]) -> Vec<String> {
        self.hash_cache.hash_files(&self.root, targets).await
    }

    pub fn invalidate_hash(&self, target: &Target) {
        self.hash_cache.invalidate(target);
    }

    /// Make sure the directory that will hold `target` exists, right
    /// before a task writes it.
    pub async fn ensure_parent_dir(&self, target: &Target) -> Result<(), BuildError> {
        let path = self.resolve(target);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| BuildError::CreateDir {
                    path: parent.display().to_string(),
                    err,
                })?;
        }
        Ok(())
    }
}

/// Counters surfaced in the end-of-run summary.
#[derive(Debug, Default)]
pub(crate) struct BuildStats {
    cache_hits: AtomicUsize,
    tasks_run: AtomicUsize,
}

impl BuildStats {
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run(&self) {
        self.tasks_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn tasks_run(&self) -> usize {
        self.tasks_run.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.tasks_run.store(0, Ordering::Relaxed);
    }
}
