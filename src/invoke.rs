//! Process invocation: run an external program with a working directory and a
//! mandatory timeout, capturing stdout and stderr.
//!
//! Programs are spawned with an argument vector. No shell is involved.
//! Each child leads its own process group. On timeout the whole group is
//! killed and the child reaped before the error is returned, so neither a hung
//! external process nor anything it started outlives the call.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time;

use crate::sanitize::command_line;

/// How long to wait for partial output after a timed-out child was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Timeout bounds for the classes of command the dashboard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Timeouts {
    /// Cheap lookups: nudges, reads, stop requests.
    pub fast_secs: u64,

    /// Town status snapshots.
    pub status_secs: u64,

    /// Mail listing and sending.
    pub mail_secs: u64,

    /// Provisioning and teardown: crew add/remove, agent start.
    pub provision_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fast_secs: 5,
            status_secs: 10,
            mail_secs: 15,
            provision_secs: 60,
        }
    }
}

impl Timeouts {
    pub fn fast(&self) -> Duration {
        Duration::from_secs(self.fast_secs)
    }

    pub fn status(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    pub fn mail(&self) -> Duration {
        Duration::from_secs(self.mail_secs)
    }

    pub fn provision(&self) -> Duration {
        Duration::from_secs(self.provision_secs)
    }
}

/// Output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Why an invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitInfo {
    /// The process ran and exited unsuccessfully. `None` when killed by a signal.
    Status(Option<i32>),

    /// The process exceeded its timeout and was killed.
    TimedOut(Duration),

    /// The process could not be started.
    Spawn(String),

    /// The working directory does not exist.
    MissingWorkdir(PathBuf),
}

impl std::fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(Some(code)) => write!(f, "exited with status {code}"),
            Self::Status(None) => write!(f, "terminated by signal"),
            Self::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs_f32()),
            Self::Spawn(reason) => write!(f, "failed to start: {reason}"),
            Self::MissingWorkdir(path) => {
                write!(f, "working directory {} does not exist", path.display())
            }
        }
    }
}

/// A failed invocation, with whatever output was captured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{command}` {exit}")]
pub struct InvocationError {
    /// The command line, shell-quoted for display.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitInfo,
}

impl InvocationError {
    /// The most useful diagnostic text: stderr, else stdout, else the exit info.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        self.exit.to_string()
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.exit, ExitInfo::TimedOut(_))
    }
}

/// A single external command, ready to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl Invocation {
    /// A command with the given program and timeout.
    ///
    /// There is no default timeout: every call site chooses one.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The command line, shell-quoted for logs and error messages.
    pub fn display(&self) -> String {
        command_line(&self.program, &self.args)
    }

    /// Run the command to completion or until the timeout elapses.
    pub async fn run(&self) -> Result<Captured, InvocationError> {
        let command = self.display();
        let fail = |exit: ExitInfo, stdout: String, stderr: String| InvocationError {
            command: command.clone(),
            stdout,
            stderr,
            exit,
        };

        if let Some(dir) = &self.cwd
            && !dir.is_dir()
        {
            return Err(fail(
                ExitInfo::MissingWorkdir(dir.clone()),
                String::new(),
                String::new(),
            ));
        }

        tracing::debug!(command = %command, timeout_secs = self.timeout.as_secs(), "invoking");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| fail(ExitInfo::Spawn(e.to_string()), String::new(), String::new()))?;

        // Drain both pipes while waiting so a chatty child can't block on a full pipe.
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let status = match time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                kill_tree(&mut child, &command).await;
                let (out, err) = collect_partial(stdout, stderr).await;
                return Err(fail(ExitInfo::Spawn(e.to_string()), out, err));
            }
            Err(_) => {
                kill_tree(&mut child, &command).await;
                tracing::warn!(command = %command, timeout_secs = self.timeout.as_secs(), "invocation timed out");
                let (out, err) = collect_partial(stdout, stderr).await;
                return Err(fail(ExitInfo::TimedOut(self.timeout), out, err));
            }
        };

        let out = stdout.await.unwrap_or_default();
        let err = stderr.await.unwrap_or_default();
        finish(status, out, err).map_err(|(exit, out, err)| fail(exit, out, err))
    }
}

/// Kill the child's process group, then the child itself, and reap it.
async fn kill_tree(child: &mut Child, command: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            tracing::debug!(command, error = %e, "failed to kill process group");
        }
    }

    // `kill` also waits, so the child is reaped before we return.
    if let Err(e) = child.kill().await {
        tracing::warn!(command, error = %e, "failed to kill timed-out process");
    }
}

type Failure = (ExitInfo, String, String);

fn finish(status: ExitStatus, stdout: String, stderr: String) -> Result<Captured, Failure> {
    if status.success() {
        Ok(Captured { stdout, stderr })
    } else {
        Err((ExitInfo::Status(status.code()), stdout, stderr))
    }
}

async fn drain<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    // A read error leaves whatever arrived before it.
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Collect output from readers of a killed child.
///
/// Grandchildren may still hold the pipes open, so readers get a short grace
/// period and are aborted after it.
async fn collect_partial(
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
) -> (String, String) {
    (with_grace(stdout).await, with_grace(stderr).await)
}

async fn with_grace(mut handle: JoinHandle<String>) -> String {
    match time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::TempDir;

    use crate::classify::{self, ErrorKind};

    fn sh(script: &str, timeout: Duration) -> Invocation {
        Invocation::new("sh", timeout).args(["-c", script])
    }

    /// Whether `pid` is a live (non-zombie) process. Polls briefly, since an
    /// orphan is reparented and reaped asynchronously.
    #[cfg(target_os = "linux")]
    async fn alive(pid: &str) -> bool {
        let stat = format!("/proc/{pid}/stat");
        for _ in 0..20 {
            let running = fs::read_to_string(&stat).is_ok_and(|s| {
                s.rsplit_once(") ")
                    .is_some_and(|(_, rest)| !rest.starts_with('Z'))
            });
            if !running {
                return false;
            }
            time::sleep(Duration::from_millis(50)).await;
        }
        true
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let captured = sh("printf out; printf err >&2", Duration::from_secs(5))
            .run()
            .await
            .unwrap();

        assert_eq!(captured.stdout, "out");
        assert_eq!(captured.stderr, "err");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let captured = sh("cat marker.txt", Duration::from_secs(5))
            .current_dir(dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(captured.stdout, "here");
    }

    #[tokio::test]
    async fn missing_working_directory_fails_before_spawn() {
        let err = sh("true", Duration::from_secs(5))
            .current_dir("/nonexistent/town/root")
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err.exit, ExitInfo::MissingWorkdir(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_output() {
        let err = sh(
            "echo partial; echo 'Error: no session found for agent x' >&2; exit 3",
            Duration::from_secs(5),
        )
        .run()
        .await
        .unwrap_err();

        assert_eq!(err.exit, ExitInfo::Status(Some(3)));
        assert_eq!(err.stdout.trim(), "partial");
        assert_eq!(err.diagnostic(), "Error: no session found for agent x");
    }

    #[tokio::test]
    async fn unknown_program_is_a_spawn_failure() {
        let err = Invocation::new("townwatch-definitely-not-a-program", Duration::from_secs(5))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err.exit, ExitInfo::Spawn(_)));
    }

    #[tokio::test]
    async fn large_output_does_not_deadlock() {
        // Well past a typical 64 KiB pipe buffer, on both streams.
        let captured = sh(
            "head -c 300000 /dev/zero | tr '\\0' a; head -c 300000 /dev/zero | tr '\\0' b >&2",
            Duration::from_secs(10),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(captured.stdout.len(), 300_000);
        assert_eq!(captured.stderr.len(), 300_000);
    }

    #[tokio::test]
    async fn timeout_kills_the_process_and_classifies_unknown() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());

        let started = std::time::Instant::now();
        let err = sh(&script, Duration::from_millis(300))
            .run()
            .await
            .unwrap_err();

        assert!(err.timed_out());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(
            classify::classify(&classify::STATUS, &err.stderr),
            ErrorKind::Unknown
        );

        #[cfg(target_os = "linux")]
        {
            let pid = fs::read_to_string(&pid_file).unwrap();
            assert!(!alive(pid.trim()).await, "process {} still running", pid.trim());
        }
    }

    #[tokio::test]
    async fn timeout_kills_background_children_too() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());

        let started = std::time::Instant::now();
        let err = sh(&script, Duration::from_millis(300))
            .run()
            .await
            .unwrap_err();

        assert!(err.timed_out());
        assert!(started.elapsed() < Duration::from_secs(10));

        #[cfg(target_os = "linux")]
        {
            let pid = fs::read_to_string(&pid_file).unwrap();
            assert!(!alive(pid.trim()).await, "background child {} still running", pid.trim());
        }
    }

    #[test]
    fn display_quotes_free_text() {
        let inv = Invocation::new("gt", Duration::from_secs(1)).args([
            "nudge",
            "gastown/crew/joe",
            "don't stop",
        ]);
        assert_eq!(inv.display(), r"gt nudge gastown/crew/joe 'don'\''t stop'");
    }
}
