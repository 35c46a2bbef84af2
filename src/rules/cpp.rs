use std::collections::HashSet;

use async_trait::async_trait;

use crate::context::BuildContext;
use crate::errors::BuildError;
use crate::options::RuleOptions;
use crate::platform::Platform;
use crate::signature::Signature;
use crate::target::Target;
use crate::task::Rule;

/// Compiles one C++ translation unit into an object file, and asks the
/// compiler for the headers it actually pulled in so they land in the
/// task's signature.
///
/// Header dependencies are *dynamic*: they only become known by running
/// the dependency scan, so each run records them for the next run's cache
/// key. The scan uses `-MT "x "` as the makefile target name; the trailing
/// space guarantees the fragment always starts with the two tokens `x :`
/// no matter what the real object path looks like, which keeps the parse
/// deterministic.
///
#[derive(Debug)]
pub(crate) struct CppRule {
    label: String,
    obj_file: Target,
    deps_file: Target,
    explicit_depends: Vec<Target>,
    obj_command: Vec<String>,
    deps_command: Vec<String>,
}

impl CppRule {
    pub fn new(
        platform: Platform,
        cpp_file: &str,
        obj_base: Option<&str>,
        opts: &RuleOptions,
    ) -> Self {
        let obj_base = obj_base
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", opts.obj_prefix, strip_extension(cpp_file)));
        let obj_suffix = opts
            .obj_suffix
            .clone()
            .unwrap_or_else(|| platform.obj_suffix().to_string());
        let obj_file = format!("{}{}", obj_base, obj_suffix);
        let deps_file = format!("{}.d", obj_base);
        let label = format!("CPP {}", obj_file);

        let mut cc = platform.compiler();
        cc.extend(opts.cpp_flags.iter().cloned());

        let mut obj_command = cc.clone();
        obj_command.extend(
            ["-c", "-o", obj_file.as_str(), cpp_file]
                .iter()
                .map(|s| s.to_string()),
        );

        let mut deps_command = cc;
        deps_command.extend(
            ["-E", "-M", "-MG", "-MT", "x ", "-MF", deps_file.as_str(), cpp_file]
                .iter()
                .map(|s| s.to_string()),
        );

        let mut explicit_depends = vec![Target::from(cpp_file)];
        explicit_depends.extend(opts.depends.iter().map(Target::from));

        Self {
            label,
            obj_file: Target::from(obj_file),
            deps_file: Target::from(deps_file),
            explicit_depends,
            obj_command,
            deps_command,
        }
    }

    pub fn object_file(&self) -> &Target {
        &self.obj_file
    }

    /// Read the dependency fragment the last scan produced and return the
    /// headers that are not already explicit prerequisites, sorted for
    /// stable signatures. A missing fragment is a first build: no extras
    /// yet.
    ///
    /// An extra dependency that is itself a registered target would be an
    /// edge the scheduler could not have discovered before running this
    /// rule once, so it is refused rather than papered over.
    async fn load_deps(&self, ctx: &BuildContext) -> Result<Vec<String>, BuildError> {
        let raw = match tokio::fs::read_to_string(ctx.resolve(&self.deps_file)).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(BuildError::DepsFileRead {
                    path: self.deps_file.to_string(),
                    err,
                });
            }
        };

        let mut tokens = split_deps_tokens(&raw);
        if tokens.len() < 2 || tokens[0] != "x" || tokens[1] != ":" {
            return Err(BuildError::MalformedDepsFile {
                path: self.deps_file.to_string(),
            });
        }
        let mut deps = tokens.split_off(2);
        deps.sort();

        let explicit: HashSet<&str> = self.explicit_depends.iter().map(|t| t.as_str()).collect();
        deps.retain(|d| !explicit.contains(d.as_str()));

        let generated: Vec<String> = deps
            .iter()
            .filter(|d| ctx.registry.owns(&Target::from(d.as_str())))
            .cloned()
            .collect();
        if !generated.is_empty() {
            return Err(BuildError::GeneratedDependencies {
                label: self.label.clone(),
                files: generated,
            });
        }

        Ok(deps)
    }
}

#[async_trait]
impl Rule for CppRule {
    fn label(&self) -> &str {
        &self.label
    }

    fn targets(&self) -> &[Target] {
        std::slice::from_ref(&self.obj_file)
    }

    async fn run(&self, ctx: &BuildContext) -> Result<(), BuildError> {
        ctx.update_targets(&self.explicit_depends, &self.label)
            .await?;

        ctx.invalidate_hash(&self.obj_file);
        ctx.ensure_parent_dir(&self.obj_file).await?;
        ctx.run_command(&self.obj_command, &format!("{}: compile", self.label))
            .await?;

        ctx.invalidate_hash(&self.deps_file);
        ctx.ensure_parent_dir(&self.deps_file).await?;
        ctx.run_command(&self.deps_command, &format!("{}: dependencies", self.label))
            .await?;

        // Feeds the next run's key; the invariant check happens now so a
        // generated header fails this build, not some later one.
        self.load_deps(ctx).await?;
        Ok(())
    }

    async fn key(&self, ctx: &BuildContext) -> Result<Option<Signature>, BuildError> {
        ctx.update_targets(&self.explicit_depends, &self.label)
            .await?;
        let extra_depends = self.load_deps(ctx).await?;

        let mut files = vec![self.obj_file.clone(), self.deps_file.clone()];
        files.extend(self.explicit_depends.iter().cloned());
        files.extend(extra_depends.iter().map(|d| Target::from(d.as_str())));
        let digests = ctx.hash_files(&files).await;

        let commands = [self.obj_command.clone(), self.deps_command.clone()];
        Ok(Some(Signature::new(&commands, digests)))
    }
}

/// Split the filename part of a path off from its last extension.
fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    }
}

/// Tokenize a make-style dependency fragment: continuation backslashes and
/// newlines collapse to spaces, then tokens break on any whitespace run
/// that is not escaped by a backslash (make's spelling for spaces inside
/// filenames).
fn split_deps_tokens(raw: &str) -> Vec<String> {
    let joined = raw.replace("\\\n", " ").replace('\n', " ");
    let joined = joined.trim();

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in joined.chars() {
        if ch.is_whitespace() && !escaped {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
        escaped = ch == '\\';
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
