// ABOUTME: Runs external commands with tokio and captures their output.
// ABOUTME: Shared by every system-backed host capability.

use super::{CommandError, CommandOutput};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;

/// Run `program` with `args` and capture its output.
///
/// Only failing to start the process is an error; the exit code is left to
/// the caller.
pub(crate) async fn run<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
) -> Result<CommandOutput, CommandError> {
    run_with_env(program, args, &[]).await
}

/// Like [`run`], but a non-zero exit is a [`CommandError::Failed`].
pub(crate) async fn run_checked<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
) -> Result<CommandOutput, CommandError> {
    checked(program, run(program, args).await?)
}

pub(crate) async fn run_with_env<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    env: &[(&str, &str)],
) -> Result<CommandOutput, CommandError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!(program, "Running command");
    let output = cmd.output().await.map_err(|e| CommandError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

pub(crate) fn checked(program: &str, output: CommandOutput) -> Result<CommandOutput, CommandError> {
    if output.success() {
        Ok(output)
    } else {
        Err(CommandError::Failed {
            program: program.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let output = run("sh", &["-c", "echo hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_run_returns_non_zero_exit() {
        let output = run("sh", &["-c", "echo oops >&2; exit 3"]).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_run_checked_fails_on_non_zero_exit() {
        let err = run_checked("sh", &["-c", "echo broken >&2; exit 1"])
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run("definitely-not-a-real-program-xyz", &["--help"])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
