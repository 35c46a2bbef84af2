use async_trait::async_trait;

use crate::context::BuildContext;
use crate::errors::BuildError;
use crate::signature::Signature;
use crate::target::{union, Target};
use crate::task::Rule;

/// The general-purpose rule: bring the prerequisites up to date, then run
/// each recipe command in order. A rule that owns any abstract target is
/// phony-like and never cached.
///
#[derive(Debug)]
pub(crate) struct CommandRule {
    label: String,
    targets: Vec<Target>,
    prerequisites: Vec<Target>,
    recipe: Vec<Vec<String>>,
    cacheable: bool,
}

impl CommandRule {
    pub fn new(targets: Vec<Target>, prerequisites: Vec<Target>, recipe: Vec<Vec<String>>) -> Self {
        let label = format!(
            "RULE {}",
            targets
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );
        let cacheable = targets.iter().all(|t| t.is_file());
        Self {
            label,
            targets,
            prerequisites,
            recipe,
            cacheable,
        }
    }
}

#[async_trait]
impl Rule for CommandRule {
    fn label(&self) -> &str {
        &self.label
    }

    fn targets(&self) -> &[Target] {
        &self.targets
    }

    async fn run(&self, ctx: &BuildContext) -> Result<(), BuildError> {
        ctx.update_targets(&self.prerequisites, &self.label).await?;

        let steps = self.recipe.len();
        for (i, argv) in self.recipe.iter().enumerate() {
            let message = format!("{} ({}/{})", self.label, i + 1, steps);
            ctx.run_command(argv, &message).await?;
        }

        for target in &self.targets {
            ctx.invalidate_hash(target);
        }
        Ok(())
    }

    async fn key(&self, ctx: &BuildContext) -> Result<Option<Signature>, BuildError> {
        if !self.cacheable {
            return Ok(None);
        }
        ctx.update_targets(&self.prerequisites, &self.label).await?;

        let files = union(&self.targets, &self.prerequisites);
        let digests = ctx.hash_files(&files).await;
        Ok(Some(Signature::new(&self.recipe, digests)))
    }
}
