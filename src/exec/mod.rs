// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Out-of-process execution of a flow graph.
//!
//! Starting a run is fire-and-forget; stopping is synchronous with a bounded wait so the
//! interactive thread can never hang on a stuck child. On expiry the child is killed and reaped
//! with a second bounded wait.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A spawned flow-graph run.
///
/// The owning document must stop the process before it is dropped; `Drop` kills as a last-resort
/// backstop so a stray child never outlives the workbench.
#[derive(Debug)]
pub struct FlowProcess {
    child: Child,
    command_line: String,
}

impl FlowProcess {
    /// Runs the generated runner artifact for a flow graph.
    pub fn spawn_runner(runner_path: &Path) -> io::Result<Self> {
        let mut command = Command::new("sh");
        command.arg(runner_path).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        let command_line = format!("sh {}", runner_path.display());
        let child = command.spawn()?;
        Ok(Self { child, command_line })
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminates the child, waiting at most `timeout` for it to be reaped.
    ///
    /// Returns `Ok` once the child has exited. `Err` means the child may still be running; the
    /// caller logs and moves on (the `Drop` backstop retries the kill).
    pub fn stop(&mut self, timeout: Duration) -> Result<(), StopError> {
        match self.child.try_wait() {
            Ok(Some(_)) => return Ok(()),
            Ok(None) => {}
            Err(source) => return Err(StopError::Wait { source }),
        }

        if let Err(source) = self.child.kill() {
            // InvalidInput means the child already exited between try_wait and kill.
            if source.kind() != io::ErrorKind::InvalidInput {
                return Err(StopError::Kill { source });
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Err(StopError::Timeout { timeout });
                    }
                    std::thread::sleep(REAP_POLL_INTERVAL);
                }
                Err(source) => return Err(StopError::Wait { source }),
            }
        }
    }
}

impl Drop for FlowProcess {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[derive(Debug)]
pub enum StopError {
    Kill { source: io::Error },
    Wait { source: io::Error },
    Timeout { timeout: Duration },
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kill { source } => write!(f, "cannot kill flow process: {source}"),
            Self::Wait { source } => write!(f, "cannot wait on flow process: {source}"),
            Self::Timeout { timeout } => {
                write!(f, "flow process did not exit within {}ms", timeout.as_millis())
            }
        }
    }
}

impl std::error::Error for StopError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Kill { source } | Self::Wait { source } => Some(source),
            Self::Timeout { .. } => None,
        }
    }
}

/// Writes the runner artifact next to the flow-graph file and returns its path.
///
/// Code generation for a real runtime is out of scope; the runner is a placeholder script so the
/// start/stop lifecycle is exercised end to end.
pub fn generate_runner(graph_path: &Path) -> io::Result<PathBuf> {
    let runner_path = runner_path_for(graph_path);
    let stem = graph_path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("flow_graph");
    let script = format!(
        "#!/bin/sh\n# Generated by flowdeck from {name}\nwhile :; do sleep 1; done\n",
        name = stem,
    );
    std::fs::write(&runner_path, script)?;
    Ok(runner_path)
}

pub fn runner_path_for(graph_path: &Path) -> PathBuf {
    graph_path.with_extension("run.sh")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{generate_runner, runner_path_for, FlowProcess};

    #[test]
    fn runner_path_swaps_extension() {
        let path = runner_path_for(std::path::Path::new("/tmp/demo.fdg"));
        assert_eq!(path, std::path::PathBuf::from("/tmp/demo.run.sh"));
    }

    #[test]
    fn spawned_runner_stops_within_timeout() {
        let dir = std::env::temp_dir().join(format!("flowdeck-exec-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph_path = dir.join("demo.fdg");
        std::fs::write(&graph_path, "{}").unwrap();

        let runner = generate_runner(&graph_path).unwrap();
        let mut process = FlowProcess::spawn_runner(&runner).unwrap();
        assert!(process.is_running());

        process.stop(Duration::from_secs(3)).unwrap();
        assert!(!process.is_running());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stop_is_idempotent_after_exit() {
        let dir = std::env::temp_dir().join(format!("flowdeck-exec-idem-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph_path = dir.join("demo.fdg");
        std::fs::write(&graph_path, "{}").unwrap();

        let runner = generate_runner(&graph_path).unwrap();
        let mut process = FlowProcess::spawn_runner(&runner).unwrap();
        process.stop(Duration::from_secs(3)).unwrap();
        process.stop(Duration::from_secs(3)).unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
