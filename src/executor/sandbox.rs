// src/executor/sandbox.rs

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::SandboxConfig;
use crate::errors::{AutotuneError, Result};
use crate::executor::{short_id, ExecutionRequest, ExecutionResult, ExecutionStatus, TrialExecutor};

/// How long pipe readers may keep draining after the trial has exited or been killed.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Runs trial code as a separate interpreter process inside a throwaway
/// directory, with a cleared environment and a hard wall-clock limit.
pub struct SandboxExecutor {
    config: SandboxConfig,
}

/// Per-call scratch directory. Removed when dropped, whatever the outcome.
struct TrialArtifact {
    dir: PathBuf,
}

impl TrialArtifact {
    async fn create(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        let dir = root.join(format!("trial-{}", uuid::Uuid::new_v4().simple()));
        // create_dir fails if the name is taken, so two calls never share a directory.
        tokio::fs::create_dir(&dir).await?;
        Ok(Self { dir })
    }
}

impl Drop for TrialArtifact {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => log::debug!("Removed trial artifact {}", self.dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove trial artifact {}: {}", self.dir.display(), e),
        }
    }
}

impl SandboxExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn script_name(&self) -> String {
        format!("main.{}", self.config.extension)
    }

    async fn run(&self, artifact: &TrialArtifact, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let id = short_id();
        let timestamp = chrono::Utc::now().to_rfc3339();
        let script = self.script_name();

        tokio::fs::write(artifact.dir.join(&script), format!("{}\n", request.code))
            .await
            .map_err(|e| AutotuneError::ExecutorHardFailure(format!("could not write trial code: {}", e)))?;

        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&script)
            .current_dir(&artifact.dir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        // Own process group, so everything the trial forks can be killed together.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            AutotuneError::ExecutorHardFailure(format!(
                "could not start '{}': {}",
                self.config.interpreter, e
            ))
        })?;
        let pid = child.id();

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stdout_reader = tokio::spawn(drain(child.stdout.take(), stdout_buf.clone()));
        let stderr_reader = tokio::spawn(drain(child.stderr.take(), stderr_buf.clone()));

        let started = Instant::now();
        let waited = tokio::time::timeout(self.config.timeout, child.wait()).await;
        let (status, exit_code) = match waited {
            Ok(Ok(exit)) => (ExecutionStatus::Completed, exit.code()),
            Ok(Err(e)) => {
                kill_process_group(pid);
                return Err(AutotuneError::ExecutorHardFailure(format!(
                    "lost track of trial process: {}",
                    e
                )));
            }
            Err(_) => {
                log::warn!(
                    "Trial {} exceeded {:?}; killing it",
                    id,
                    self.config.timeout
                );
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill timed out trial {}: {}", id, e);
                }
                (ExecutionStatus::TimedOut, None)
            }
        };
        // Background processes left behind by a finished trial go too.
        kill_process_group(pid);

        let stdout = collect(stdout_reader, &stdout_buf).await;
        let stderr = collect(stderr_reader, &stderr_buf).await;

        log::info!(
            "Trial {} {} in {}ms (exit code {:?})",
            id,
            status,
            started.elapsed().as_millis(),
            exit_code
        );

        Ok(ExecutionResult {
            id,
            timestamp,
            description: request.description.clone(),
            status,
            exit_code,
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl TrialExecutor for SandboxExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let artifact = TrialArtifact::create(&self.config.root).await.map_err(|e| {
            AutotuneError::ExecutorHardFailure(format!("could not prepare sandbox: {}", e))
        })?;
        self.run(&artifact, request).await
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to kill trial process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Copies a pipe into `sink` chunk by chunk, so a reader abandoned mid-stream
/// still leaves behind everything it read.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, sink: Arc<Mutex<Vec<u8>>>) {
    let Some(mut pipe) = pipe else { return };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
            Err(e) => {
                log::debug!("Trial output pipe closed with error: {}", e);
                break;
            }
        }
    }
}

async fn collect(mut reader: JoinHandle<()>, sink: &Mutex<Vec<u8>>) -> String {
    let drained = tokio::time::timeout(PIPE_GRACE, &mut reader).await;
    match drained {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Trial output reader failed: {}", e),
        Err(_) => {
            reader.abort();
            log::warn!("Trial output pipe still open after the process group was killed");
        }
    }
    let bytes = sink.lock().await;
    String::from_utf8_lossy(&bytes).into_owned()
}
