use std::fmt;
use std::path::{Path, PathBuf};

/// The name of something a task produces or consumes.
///
/// Two flavors share one namespace: *file* targets are POSIX-style relative
/// paths whose content is observable on disk, and *abstract* targets are
/// `:`-prefixed labels (`:test`, `:dist`) that group other targets and never
/// touch the filesystem.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target(String);

impl Target {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn is_abstract(&self) -> bool {
        self.0.starts_with(':')
    }

    pub fn is_file(&self) -> bool {
        !self.is_abstract()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The on-disk location of a file target, resolved against an engine
    /// root. Never called for abstract targets.
    pub fn resolve_against(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for Target {
    fn from(raw: &String) -> Self {
        Self::new(raw.clone())
    }
}

impl AsRef<str> for Target {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Targets from `a` then `b`, first occurrence wins.
pub(crate) fn union(a: &[Target], b: &[Target]) -> Vec<Target> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(a.len() + b.len());
    for target in a.iter().chain(b.iter()) {
        if seen.insert(target.clone()) {
            out.push(target.clone());
        }
    }
    out
}
