use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use console::style;
use tokio::process::Command;
use tracing::debug;

use crate::errors::BuildError;
use crate::job_pool::JobPool;

/// Spawns external commands: argv-only, no shell, stdout/stderr inherited,
/// stdin closed. Every spawn goes through the job pool so the number of
/// live child processes stays bounded.
///
#[derive(Debug)]
pub struct CommandRunner {
    pool: Arc<JobPool>,
}

impl CommandRunner {
    pub fn new(pool: Arc<JobPool>) -> Self {
        Self { pool }
    }

    #[tracing::instrument(name = "CommandRunner::run", skip(self, argv))]
    pub async fn run(&self, cwd: &Path, argv: &[String], message: &str) -> Result<(), BuildError> {
        let (program, args) = argv.split_first().ok_or_else(|| BuildError::EmptyCommand {
            label: message.to_string(),
        })?;
        let pretty = pretty_command(argv);

        self.pool
            .submit(async {
                println!("{}", style(message).dim());
                println!("{}", style(&pretty).dim());

                let status = Command::new(program)
                    .args(args)
                    .current_dir(cwd)
                    .stdin(Stdio::null())
                    .status()
                    .await
                    .map_err(|err| BuildError::CommandSpawn {
                        command: pretty.clone(),
                        err,
                    })?;

                debug!(?status, command = %pretty, "command finished");

                if status.success() {
                    Ok(())
                } else {
                    Err(BuildError::CommandFailed {
                        status,
                        command: pretty.clone(),
                    })
                }
            })
            .await
    }
}

/// Render an argv the way a shell user could paste it back: each token is
/// wrapped in single quotes (embedded quotes doubled) iff it contains a
/// shell-significant character or starts with `=` or `#`.
pub(crate) fn pretty_command(argv: &[String]) -> String {
    argv.iter()
        .map(|token| quote_token(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_token(token: &str) -> String {
    const SIGNIFICANT: &[char] = &[
        ' ', '\t', '\n', '!', '"', '\'', '$', '&', '(', ')', '*', ',', ';', '<', '>', '?', '[',
        '\\', ']', '^', '`', '{', '|', '}', '~',
    ];
    let needs_quoting = token.starts_with('=')
        || token.starts_with('#')
        || token.chars().any(|c| SIGNIFICANT.contains(&c));
    if needs_quoting {
        format!("'{}'", token.replace('\'', "''"))
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_pool::JobPool;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn plain_tokens_stay_unquoted() {
        assert_eq!(
            pretty_command(&argv(&["g++", "-c", "-o", "objs/Player.o"])),
            "g++ -c -o objs/Player.o"
        );
    }

    #[test]
    fn shell_significant_tokens_get_single_quotes() {
        assert_eq!(pretty_command(&argv(&["a b"])), "'a b'");
        assert_eq!(pretty_command(&argv(&["x "])), "'x '");
        assert_eq!(pretty_command(&argv(&["$HOME"])), "'$HOME'");
        assert_eq!(pretty_command(&argv(&["=x"])), "'=x'");
        assert_eq!(pretty_command(&argv(&["#x"])), "'#x'");
    }

    #[test]
    fn embedded_single_quotes_are_doubled() {
        assert_eq!(pretty_command(&argv(&["it's"])), "'it''s'");
    }

    #[tokio::test]
    async fn zero_exit_resolves() {
        let runner = CommandRunner::new(std::sync::Arc::new(JobPool::new(1)));
        let result = runner
            .run(Path::new("."), &argv(&["true"]), "probe")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn nonzero_exit_fails_naming_the_command() {
        let runner = CommandRunner::new(std::sync::Arc::new(JobPool::new(1)));
        let result = runner
            .run(Path::new("."), &argv(&["false"]), "probe")
            .await;
        match result {
            Err(BuildError::CommandFailed { command, .. }) => assert_eq!(command, "false"),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn spawn_errors_fail_instead_of_panicking() {
        let runner = CommandRunner::new(std::sync::Arc::new(JobPool::new(1)));
        let result = runner
            .run(
                Path::new("."),
                &argv(&["definitely-not-a-real-binary-9000"]),
                "probe",
            )
            .await;
        assert!(matches!(result, Err(BuildError::CommandSpawn { .. })));
    }
}
