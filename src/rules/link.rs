use async_trait::async_trait;

use crate::context::BuildContext;
use crate::errors::BuildError;
use crate::options::RuleOptions;
use crate::platform::Platform;
use crate::signature::Signature;
use crate::target::{union, Target};
use crate::task::Rule;

/// Links object files into an executable.
#[derive(Debug)]
pub(crate) struct LinkRule {
    label: String,
    exe_file: Target,
    depends: Vec<Target>,
    link_command: Vec<String>,
}

impl LinkRule {
    pub fn new(
        platform: Platform,
        obj_files: Vec<Target>,
        exe_base: &str,
        opts: &RuleOptions,
    ) -> Self {
        let exe_suffix = opts
            .exe_suffix
            .clone()
            .unwrap_or_else(|| platform.exe_suffix().to_string());
        let exe_file = format!("{}{}", exe_base, exe_suffix);
        let label = format!("LINK {}", exe_file);

        let mut link_command = platform.compiler();
        link_command.push("-o".to_string());
        link_command.push(exe_file.clone());
        link_command.extend(obj_files.iter().map(|t| t.as_str().to_string()));
        link_command.extend(opts.link_libs.iter().cloned());

        let extra: Vec<Target> = opts.depends.iter().map(Target::from).collect();
        let depends = union(&obj_files, &extra);

        Self {
            label,
            exe_file: Target::from(exe_file),
            depends,
            link_command,
        }
    }

    pub fn exe_file(&self) -> &Target {
        &self.exe_file
    }
}

#[async_trait]
impl Rule for LinkRule {
    fn label(&self) -> &str {
        &self.label
    }

    fn targets(&self) -> &[Target] {
        std::slice::from_ref(&self.exe_file)
    }

    async fn run(&self, ctx: &BuildContext) -> Result<(), BuildError> {
        ctx.update_targets(&self.depends, &self.label).await?;

        ctx.invalidate_hash(&self.exe_file);
        ctx.ensure_parent_dir(&self.exe_file).await?;
        ctx.run_command(&self.link_command, &format!("{}: link", self.label))
            .await
    }

    async fn key(&self, ctx: &BuildContext) -> Result<Option<Signature>, BuildError> {
        ctx.update_targets(&self.depends, &self.label).await?;

        let files = union(std::slice::from_ref(&self.exe_file), &self.depends);
        let digests = ctx.hash_files(&files).await;

        let commands = [self.link_command.clone()];
        Ok(Some(Signature::new(&commands, digests)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_link_command_names_every_object_and_library() {
        let opts = RuleOptions {
            link_libs: vec!["-lSDL2".to_string()],
            ..RuleOptions::default()
        };
        let rule = LinkRule::new(
            Platform::Linux,
            vec![Target::from("objs/Player.o"), Target::from("objs/game.o")],
            "dist/game",
            &opts,
        );

        assert_eq!(rule.exe_file.as_str(), "dist/game");
        assert_eq!(rule.label(), "LINK dist/game");
        assert_eq!(
            rule.link_command,
            vec![
                "g++",
                "-std=c++2a",
                "-Wall",
                "-Werror",
                "-g",
                "-o",
                "dist/game",
                "objs/Player.o",
                "objs/game.o",
                "-lSDL2"
            ]
        );
    }

    #[test]
    fn extra_depends_join_the_objects_without_duplicates() {
        let opts = RuleOptions {
            depends: vec!["objs/Player.o".to_string(), "assets/pack.bin".to_string()],
            ..RuleOptions::default()
        };
        let rule = LinkRule::new(
            Platform::Linux,
            vec![Target::from("objs/Player.o")],
            "dist/game",
            &opts,
        );
        let names: Vec<&str> = rule.depends.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["objs/Player.o", "assets/pack.bin"]);
    }
}
