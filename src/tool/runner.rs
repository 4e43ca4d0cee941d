use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ResolveError, Result};

/// Variables passed through to a sanitized child. Everything else is dropped,
/// including `GRADLE_OPTS`, `JAVA_OPTS`, `JAVA_TOOL_OPTIONS` and `_JAVA_OPTIONS`.
const ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "USERNAME",
    "JAVA_HOME",
    "GRADLE_USER_HOME",
    "LANG",
    "LC_ALL",
    "TMPDIR",
    "TEMP",
    "TMP",
    "USERPROFILE",
    "APPDATA",
    "LOCALAPPDATA",
    "SystemRoot",
    "ComSpec",
    "PATHEXT",
];

/// A fixed, shell-free command line for the build tool.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Clear the environment down to [`ENV_ALLOWLIST`].
    pub sanitized: bool,
    pub timeout: Duration,
}

impl Invocation {
    pub fn display(&self) -> String {
        format!("{} {}", self.program.display(), self.args.join(" "))
    }

    fn command(&self) -> Command {
        let mut cmd = if runs_through_sh(&self.program) {
            let mut cmd = Command::new("sh");
            cmd.arg(&self.program);
            cmd
        } else {
            Command::new(&self.program)
        };

        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.sanitized {
            cmd.env_clear();
            for (key, value) in allowed_env() {
                cmd.env(key, value);
            }
            cmd.env("TERM", "dumb");
        }

        cmd
    }
}

fn allowed_env() -> Vec<(&'static str, OsString)> {
    ENV_ALLOWLIST
        .iter()
        .filter_map(|key| std::env::var_os(key).map(|value| (*key, value)))
        .collect()
}

/// A checked-out wrapper script often lacks its execute bit; run it through `sh`.
#[cfg(unix)]
fn runs_through_sh(program: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    if program.components().count() < 2 {
        return false;
    }
    match std::fs::metadata(program) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 == 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn runs_through_sh(_program: &Path) -> bool {
    false
}

/// Run `invocation` to completion and return stdout lines followed by stderr lines.
///
/// A non-zero exit, spawn failure or timeout is a [`ResolveError::SubprocessFailure`]
/// labelled with `bucket`. On timeout the child is killed when its handle drops.
pub async fn run(invocation: &Invocation, bucket: &str) -> Result<Vec<String>> {
    let failure = |reason: String| ResolveError::SubprocessFailure {
        bucket: bucket.to_string(),
        command: invocation.display(),
        reason,
    };

    debug!(command = %invocation.display(), sanitized = invocation.sanitized, bucket, "spawning");
    let child = invocation
        .command()
        .spawn()
        .map_err(|e| failure(format!("failed to start: {e}")))?;

    let output = match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(failure(e.to_string())),
        Err(_) => {
            return Err(failure(format!(
                "timed out after {}s",
                invocation.timeout.as_secs()
            )))
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let tail: Vec<&str> = stderr
            .lines()
            .chain(stdout.lines())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(3)
            .collect();
        return Err(failure(format!("{}: {}", output.status, tail.join(" | "))));
    }

    Ok(stdout.lines().chain(stderr.lines()).map(str::to_string).collect())
}

/// `program --version` exits zero within `timeout`. Anything else means "not available".
pub async fn probe(program: &Path, timeout: Duration) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!(program = %program.display(), error = %e, "probe failed to start");
            false
        }
        Err(_) => {
            debug!(program = %program.display(), "probe timed out");
            false
        }
    }
}
