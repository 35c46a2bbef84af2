//! Recursive target resolution with promise-memoized, at-most-once task
//! execution.

use console::style;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use crate::context::BuildContext;
use crate::errors::BuildError;
use crate::signature::Signature;
use crate::target::Target;
use crate::task::{Rule, TaskId};

type TaskFuture = Shared<BoxFuture<'static, ()>>;

/// Scheduler-owned run state for one task. Everything here mutates during
/// an update; the task declaration itself never does.
#[derive(Default)]
struct TaskState {
    /// Who first requested this task, for debugging.
    src: Option<String>,
    /// The in-flight (or settled) execution. Set exactly once per update;
    /// every later requester awaits this same future.
    pending: Option<TaskFuture>,
    /// Signature recorded from the last successful run.
    cached_key: Option<Signature>,
    failed: bool,
}

pub(crate) struct Scheduler {
    states: DashMap<TaskId, TaskState>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Forget all run state, including loaded keys. Called at the top of
    /// every `update` before the prior keys are read back in.
    pub fn reset(&self) {
        self.states.clear();
    }

    pub fn assign_cached_key(&self, id: TaskId, key: Signature) {
        self.states.entry(id).or_default().cached_key = Some(key);
    }

    pub fn cached_key(&self, id: TaskId) -> Option<Signature> {
        self.states.get(&id).and_then(|s| s.cached_key.clone())
    }

    fn clear_cached_key(&self, id: TaskId) {
        if let Some(mut state) = self.states.get_mut(&id) {
            state.cached_key = None;
        }
    }

    /// A failed task also drops its prior key, so the next run cannot skip
    /// over the failure.
    fn mark_failed(&self, id: TaskId) {
        let mut state = self.states.entry(id).or_default();
        state.failed = true;
        state.cached_key = None;
    }

    pub fn is_failed(&self, id: TaskId) -> bool {
        self.states.get(&id).map(|s| s.failed).unwrap_or(false)
    }

    /// Join the task's in-flight future, or stamp `src` and start it.
    fn join_or_start<F>(&self, id: TaskId, src: &str, start: F) -> TaskFuture
    where
        F: FnOnce() -> TaskFuture,
    {
        let mut state = self.states.entry(id).or_default();
        if let Some(pending) = &state.pending {
            return pending.clone();
        }
        state.src = Some(src.to_string());
        let pending = start();
        state.pending = Some(pending.clone());
        pending
    }
}

impl BuildContext {
    /// Bring every requested target up to date, recursively.
    ///
    /// The whole wave settles before failures are reported: a sibling that
    /// can make progress is never cut short by another sibling's failure.
    /// Only then does the first target owned by a failed task produce its
    /// `for lack of ...` error.
    #[tracing::instrument(name = "BuildContext::update_targets", skip(self, targets))]
    pub async fn update_targets(&self, targets: &[Target], src: &str) -> Result<(), BuildError> {
        let mut wave = Vec::with_capacity(targets.len());
        let mut probes = Vec::new();

        for target in targets {
            match self.registry.owner(target) {
                Some(id) => wave.push(self.ensure_started(id, src)),
                None if target.is_abstract() => {
                    return Err(BuildError::AbstractTargetUndefined {
                        target: target.clone(),
                        src: src.to_string(),
                    });
                }
                None => probes.push(target.clone()),
            }
        }

        let probe_all = async {
            let mut result = Ok(());
            for target in &probes {
                if tokio::fs::File::open(self.resolve(target)).await.is_err() {
                    result = Err(BuildError::MissingSource {
                        target: target.clone(),
                        src: src.to_string(),
                    });
                    break;
                }
            }
            result
        };
        let (_, probed) = futures::join!(futures::future::join_all(wave), probe_all);
        probed?;

        for target in targets {
            if let Some(id) = self.registry.owner(target) {
                if self.scheduler.is_failed(id) {
                    return Err(BuildError::ForLackOf {
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn ensure_started(&self, id: TaskId, src: &str) -> TaskFuture {
        self.scheduler.join_or_start(id, src, || {
            let ctx = self.clone();
            async move { ctx.drive_task(id).await }.boxed().shared()
        })
    }

    /// Run one task to completion, translating its `BuildError` into the
    /// failed flag so the error is reported exactly once. Anything that is
    /// not a `BuildError` unwinds past the scheduler and aborts the build.
    async fn drive_task(self, id: TaskId) {
        let task = self.registry.task(id);
        if let Err(err) = self.start_task(&*task, id).await {
            self.scheduler.mark_failed(id);
            eprintln!(
                "{}",
                style(format!("!!! FAILED [{}] {}", task.label(), err)).red()
            );
        }
    }

    async fn start_task(&self, task: &dyn Rule, id: TaskId) -> Result<(), BuildError> {
        if let Some(prior) = self.scheduler.cached_key(id) {
            if let Some(key) = task.key(self).await? {
                if key == prior {
                    debug!(label = task.label(), "signature unchanged, skipping");
                    self.stats.record_cache_hit();
                    return Ok(());
                }
            }
        }

        self.scheduler.clear_cached_key(id);
        task.run(self).await?;
        self.stats.record_run();

        if let Some(key) = task.key(self).await? {
            self.scheduler.assign_cached_key(id, key);
        }
        Ok(())
    }
}
