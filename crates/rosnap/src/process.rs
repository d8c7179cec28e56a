//! External command execution with log capture
//!
//! Tool output is forwarded line by line through tracing: stdout at debug
//! level and stderr at warn level, both under the `tool_output` target.

use camino::Utf8Path;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use crate::{Error, Result};

/// Run `argv` in `cwd` and fail unless it exits successfully
///
/// `operation` names the step in log lines and error messages.
pub fn run_command(argv: &[String], cwd: &Utf8Path, operation: &str) -> Result<()> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        Error::process(
            format!("{} has an empty command line", operation),
            "Configure a command or disable this step",
        )
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::info!(%cwd, "{}: {}", operation, argv.join(" "));

    let mut child = command.spawn().map_err(|e| {
        Error::process(
            format!("{} failed to start: {}", operation, e),
            format!("Ensure '{}' is installed and on PATH", program),
        )
    })?;

    let stderr = child.stderr.take();
    let stderr_handle = std::thread::spawn(move || {
        if let Some(stderr) = stderr {
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                tracing::warn!(target: "tool_output", "{}", line);
            }
        }
    });

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
            tracing::debug!(target: "tool_output", "{}", line);
        }
    }

    let status = child.wait().map_err(|e| {
        Error::process(format!("{} failed: {}", operation, e), "Check the tool output above")
    })?;
    let _ = stderr_handle.join();

    if !status.success() {
        return Err(Error::process(
            format!("{} failed with {}", operation, status),
            "Check the tool output above for errors",
        ));
    }

    Ok(())
}
