use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::errors::ConfigError;
use crate::target::Target;
use crate::task::{Rule, TaskId};

/// Keeps track of every installed task and which task owns each declared
/// target. A task may own many targets; a target belongs to exactly one
/// task, and installing a second owner is a configuration error.
///
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: DashMap<TaskId, Arc<dyn Rule>>,
    owners: DashMap<Target, TaskId>,
    next_id: AtomicUsize,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, rule: Arc<dyn Rule>) -> Result<TaskId, ConfigError> {
        for target in rule.targets() {
            if let Some(existing) = self.owners.get(target) {
                let existing = self
                    .tasks
                    .get(existing.value())
                    .map(|t| t.label().to_string())
                    .unwrap_or_default();
                return Err(ConfigError::DuplicateTarget {
                    target: target.clone(),
                    existing,
                });
            }
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        for target in rule.targets() {
            self.owners.insert(target.clone(), id);
        }
        self.tasks.insert(id, rule);
        Ok(id)
    }

    pub fn owner(&self, target: &Target) -> Option<TaskId> {
        self.owners.get(target).map(|id| *id.value())
    }

    pub fn owns(&self, target: &Target) -> bool {
        self.owners.contains_key(target)
    }

    pub fn task(&self, id: TaskId) -> Arc<dyn Rule> {
        self.tasks
            .get(&id)
            .map(|t| t.value().clone())
            .expect("task id handed out by this registry")
    }

    /// Snapshot of (target, owning task), for the cache store flush.
    pub fn owned_targets(&self) -> Vec<(Target, TaskId)> {
        let mut entries: Vec<(Target, TaskId)> = self
            .owners
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort();
        entries
    }
}
