//! Child process execution.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        out.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }
}

/// Run `argv` to completion and capture its output.
///
/// The child is killed if the returned future is dropped, so a timeout applied
/// by the caller does not leave orphaned renderer processes behind.
pub async fn execute(argv: &[String], cwd: Option<&Path>) -> anyhow::Result<ProcessOutput> {
    let Some((exe, args)) = argv.split_first() else {
        anyhow::bail!("empty command");
    };

    let start = Instant::now();
    let mut command = Command::new(exe);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = command
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to spawn {exe}: {e}"))?;
    let output = child.wait_with_output().await?;

    Ok(ProcessOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}
