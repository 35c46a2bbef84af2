use crate::target::Target;
use thiserror::Error;

/// A mistake in the build configuration itself. Fatal at startup, before
/// any task runs.
///
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("building on {0} is not implemented")]
    UnsupportedPlatform(String),

    #[error("target {target} is already produced by {existing}")]
    DuplicateTarget { target: Target, existing: String },
}

/// An expected failure of one specific task. Caught by the scheduler,
/// reported once, and never fatal to the engine itself; anything outside
/// this taxonomy propagates unhandled.
///
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("abstract target {target} requested by {src} is not defined")]
    AbstractTargetUndefined { target: Target, src: String },

    #[error("file {target} requested by {src} does not exist and no task produces it")]
    MissingSource { target: Target, src: String },

    #[error("for lack of {target}")]
    ForLackOf { target: Target },

    #[error("could not spawn {command}: {err}")]
    CommandSpawn {
        command: String,
        #[source]
        err: std::io::Error,
    },

    #[error("command failed ({status}): {command}")]
    CommandFailed {
        status: std::process::ExitStatus,
        command: String,
    },

    #[error("recipe step {label} has an empty command line")]
    EmptyCommand { label: String },

    #[error("could not create directory {path}: {err}")]
    CreateDir {
        path: String,
        #[source]
        err: std::io::Error,
    },

    #[error("could not read dependency file {path}: {err}")]
    DepsFileRead {
        path: String,
        #[source]
        err: std::io::Error,
    },

    #[error("dependency file {path} does not start with the expected sentinel target")]
    MalformedDepsFile { path: String },

    #[error("{label} depends on generated files: {}", .files.join(", "))]
    GeneratedDependencies { label: String, files: Vec<String> },
}
