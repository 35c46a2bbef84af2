use async_trait::async_trait;

use crate::context::BuildContext;
use crate::errors::BuildError;
use crate::signature::Signature;
use crate::target::Target;

/// Handle for one installed task. Allocated by the registry; the scheduler
/// keys all of its mutable run state by this id so the task declarations
/// themselves stay immutable after configuration.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TaskId(pub(crate) usize);

/// The immutable declaration of a task: what it produces, how to bring
/// that up to date, and how to summarize its inputs for the cache.
///
/// `run` may assume prerequisites are current only after it has updated
/// them itself; on successful return every declared file target must exist
/// and be readable. `key` returns `None` for tasks that are never cached
/// (any task owning an abstract target), and must be deterministic for
/// unchanged inputs.
///
#[async_trait]
pub(crate) trait Rule: std::fmt::Debug + Send + Sync {
    fn label(&self) -> &str;

    fn targets(&self) -> &[Target];

    async fn run(&self, ctx: &BuildContext) -> Result<(), BuildError>;

    async fn key(&self, ctx: &BuildContext) -> Result<Option<Signature>, BuildError>;
}
