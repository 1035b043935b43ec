//! Runnable capability
//!
//! Anything that can be started in a working directory under a deadline
//! and reports back an [`ExecutionAttempt`]. The engine only ever sees
//! this trait, never a particular scripting runtime.

use async_trait::async_trait;
use chrono::Utc;
use feedrun_core::domain::execution::{AttemptStatus, CapturedOutput, ExecutionAttempt};
use feedrun_core::domain::job::JobDescriptor;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::capture::CaptureBuffer;

/// How long to wait for output pipes to close once the process is gone
const PIPE_GRACE: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Runnable: Send + Sync {
    /// Runs once in `cwd`, killing the process if it outlives `timeout`
    ///
    /// Never fails: every problem is classified into the returned attempt.
    async fn spawn(&self, attempt_number: u32, cwd: &Path, timeout: Duration)
    -> ExecutionAttempt;
}

/// External program with fixed arguments and extra environment
#[derive(Debug, Clone)]
pub struct ScriptCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub capture_limit: usize,
}

impl ScriptCommand {
    /// Command line for a job, with `FEEDRUN_JOB_ID` and `FEEDRUN_OUTPUT_FILE` set
    pub fn for_job(job: &JobDescriptor, capture_limit: usize) -> Self {
        let (program, args) = job.source.command_line();
        Self {
            program,
            args,
            env: vec![
                ("FEEDRUN_JOB_ID".to_string(), job.id.clone()),
                (
                    "FEEDRUN_OUTPUT_FILE".to_string(),
                    job.output_path().to_string_lossy().to_string(),
                ),
            ],
            capture_limit,
        }
    }
}

#[async_trait]
impl Runnable for ScriptCommand {
    async fn spawn(
        &self,
        attempt_number: u32,
        cwd: &Path,
        timeout: Duration,
    ) -> ExecutionAttempt {
        let started_at = Utc::now();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so the whole tree can be signalled at once
        #[cfg(unix)]
        command.process_group(0);

        debug!("Spawning {} {:?} in {}", self.program, self.args, cwd.display());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", self.program, e);
                return ExecutionAttempt::spawn_failure(attempt_number, started_at, e.to_string());
            }
        };

        let mut group = ProcessGroup::new(child.id());

        let stdout = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(CaptureBuffer::new(self.capture_limit).drain_from(pipe)));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(CaptureBuffer::new(self.capture_limit).drain_from(pipe)));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(exit)) => classify_exit(exit),
            Ok(Err(e)) => {
                warn!("Failed to wait for {}: {}", self.program, e);
                group.kill();
                let _ = child.kill().await;
                AttemptStatus::Failure {
                    exit_code: None,
                    signal: None,
                }
            }
            Err(_elapsed) => {
                warn!(
                    "{} exceeded its {}s timeout, killing process group",
                    self.program,
                    timeout.as_secs()
                );
                group.kill();
                // Reaps the direct child after the group kill
                let _ = child.kill().await;
                AttemptStatus::Timeout {
                    timeout_seconds: timeout.as_secs(),
                }
            }
        };

        // Anything the script left running in its group goes too
        group.sweep();

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;

        ExecutionAttempt {
            attempt_number,
            started_at,
            ended_at: Utc::now(),
            status,
            stdout,
            stderr,
        }
    }
}

/// Waits for a capture task, giving up if the pipe stays open too long
async fn collect(task: Option<JoinHandle<CapturedOutput>>) -> CapturedOutput {
    let Some(mut task) = task else {
        return Default::default();
    };

    match tokio::time::timeout(PIPE_GRACE, &mut task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Output capture task failed: {}", e);
            Default::default()
        }
        Err(_) => {
            warn!("Output pipe still open after process exit, dropping capture");
            task.abort();
            Default::default()
        }
    }
}

fn classify_exit(exit: ExitStatus) -> AttemptStatus {
    if exit.success() {
        return AttemptStatus::Success;
    }

    #[cfg(unix)]
    let signal = std::os::unix::process::ExitStatusExt::signal(&exit);
    #[cfg(not(unix))]
    let signal = None;

    AttemptStatus::Failure {
        exit_code: exit.code(),
        signal,
    }
}

/// Process group of a spawned child
///
/// Dropping the guard kills the group, which covers cancellation: when the
/// future driving an attempt is dropped (timeout or Ctrl-C), nothing the
/// script started survives it.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    #[cfg(unix)]
    fn kill(&self) {
        if let Some(pgid) = self.pgid {
            // SAFETY: killpg has no memory-safety preconditions; ESRCH is
            // returned when the group is already gone.
            unsafe {
                libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}

    /// Final kill once the leader is reaped, then disarms the guard
    ///
    /// After this the id may be reused by an unrelated group.
    fn sweep(&mut self) {
        self.kill();
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
