use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use tracing::debug;

use crate::cache_store::{CacheStore, CacheStoreError};
use crate::context::BuildContext;
use crate::errors::ConfigError;
use crate::options::RuleOptions;
use crate::platform::Platform;
use crate::rules::{CommandRule, CppRule, LinkRule};
use crate::target::Target;

/// Where the engine lives and how big it is.
#[derive(Debug, Clone)]
pub struct MaekOptions {
    /// Every target path resolves against this directory, and child
    /// processes run inside it.
    pub root: PathBuf,
    /// Cache file location, relative to `root`.
    pub cache_file: PathBuf,
    /// Maximum live child processes. Defaults to `host_cpu_count + 1`.
    pub jobs: Option<usize>,
}

impl Default for MaekOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cache_file: PathBuf::from("maek-cache.json"),
            jobs: None,
        }
    }
}

/// The build engine. Configure it by installing tasks through [`rule`],
/// [`cpp`], and [`link`], then bring targets up to date with [`update`].
///
/// [`rule`]: Maek::rule
/// [`cpp`]: Maek::cpp
/// [`link`]: Maek::link
/// [`update`]: Maek::update
pub struct Maek {
    ctx: BuildContext,
    cache: CacheStore,
}

impl Maek {
    pub fn new(opts: MaekOptions) -> Result<Self, ConfigError> {
        let platform = Platform::host()?;
        let jobs = opts.jobs.unwrap_or_else(|| num_cpus::get() + 1);
        let ctx = BuildContext::new(platform, opts.root.clone(), jobs);
        let cache = CacheStore::new(opts.root.join(&opts.cache_file));
        Ok(Self { ctx, cache })
    }

    /// Engine rooted in the current directory with host defaults.
    pub fn host() -> Result<Self, ConfigError> {
        Self::new(MaekOptions::default())
    }

    pub fn platform(&self) -> Platform {
        self.ctx.platform
    }

    /// Install a task that produces `targets` from `prerequisites` by
    /// running each command in `recipe` in order.
    pub fn rule<T, P>(
        &self,
        targets: T,
        prerequisites: P,
        recipe: Vec<Vec<String>>,
    ) -> Result<(), ConfigError>
    where
        T: IntoIterator,
        T::Item: Into<Target>,
        P: IntoIterator,
        P::Item: Into<Target>,
    {
        let rule = CommandRule::new(
            targets.into_iter().map(Into::into).collect(),
            prerequisites.into_iter().map(Into::into).collect(),
            recipe,
        );
        self.ctx.registry.install(Arc::new(rule))?;
        Ok(())
    }

    /// Install a task that compiles `cpp_file`, returning the object file
    /// target it will produce.
    pub fn cpp(
        &self,
        cpp_file: &str,
        obj_base: Option<&str>,
        opts: RuleOptions,
    ) -> Result<String, ConfigError> {
        let rule = CppRule::new(self.ctx.platform, cpp_file, obj_base, &opts);
        let obj_file = rule.object_file().to_string();
        self.ctx.registry.install(Arc::new(rule))?;
        Ok(obj_file)
    }

    /// Install a task that links `obj_files` into an executable, returning
    /// the executable target it will produce.
    pub fn link<O>(
        &self,
        obj_files: O,
        exe_base: &str,
        opts: RuleOptions,
    ) -> Result<String, ConfigError>
    where
        O: IntoIterator,
        O::Item: Into<Target>,
    {
        let rule = LinkRule::new(
            self.ctx.platform,
            obj_files.into_iter().map(Into::into).collect(),
            exe_base,
            &opts,
        );
        let exe_file = rule.exe_file().to_string();
        self.ctx.registry.install(Arc::new(rule))?;
        Ok(exe_file)
    }

    /// Bring `targets` up to date and persist the surviving signatures.
    ///
    /// Returns `Ok(true)` when everything is up to date and `Ok(false)`
    /// when the build failed (the failure has already been reported); only
    /// a cache-file write error is an `Err`.
    #[tracing::instrument(name = "Maek::update", skip(self, targets))]
    pub async fn update<T>(&self, targets: T) -> Result<bool, CacheStoreError>
    where
        T: IntoIterator,
        T::Item: Into<Target>,
    {
        let targets: Vec<Target> = targets.into_iter().map(Into::into).collect();

        self.ctx.scheduler.reset();
        self.ctx.hash_cache.clear();
        self.ctx.stats.reset();
        let load = self.cache.load(&self.ctx).await;
        debug!(loaded = load.loaded, removed = load.removed, "cache loaded");

        let outcome = self.ctx.update_targets(&targets, "user").await;
        let ok = match outcome {
            Ok(()) => true,
            Err(err) => {
                eprintln!("{}", style(format!("FAILED: {}", err)).red());
                false
            }
        };

        let flush = self.cache.flush(&self.ctx).await?;
        println!(
            "{}",
            style(format!(
                "cache: {} hits, {} tasks ran, {} keys written, {} stale entries dropped",
                self.ctx.stats.cache_hits(),
                self.ctx.stats.tasks_run(),
                flush.written,
                load.removed,
            ))
            .dim()
        );

        if ok {
            println!("Targets are now up to date");
        }
        Ok(ok)
    }
}
