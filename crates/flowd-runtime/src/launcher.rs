//! Starting one component process and draining its output.

use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use flowd_network::ProcessPipes;
use flowd_pipe::PortArgs;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::Verbosity;
use crate::error::RuntimeError;
use crate::sink::{LineSink, StreamKind};

/// Everything needed to start one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub name: String,
    /// Executable path.
    pub component: String,
    pub pipes: ProcessPipes,
    /// Port bindings and free arguments, in argv order.
    pub args: PortArgs,
}

impl LaunchSpec {
    /// Full argv as the component sees it, starting with its process name.
    pub fn argv(&self) -> Vec<OsString> {
        std::iter::once(OsString::from(&self.name))
            .chain(self.args.to_argv())
            .collect()
    }
}

/// Reported once per process when it has exited or could not be started.
#[derive(Debug)]
pub struct ExitNotice {
    pub process: String,
    pub outcome: ExitOutcome,
}

#[derive(Debug)]
pub enum ExitOutcome {
    /// The process ran and exited with this status.
    Exited(ExitStatus),
    /// The process outlived its deadline and was killed.
    TimedOut,
    /// The process could not be started or waited for.
    Failed(RuntimeError),
}

/// Coordinator-side handle of a launched process: its two drain markers.
#[derive(Debug)]
pub struct Instance {
    process: String,
    stdout_drained: oneshot::Receiver<()>,
    stderr_drained: oneshot::Receiver<()>,
}

/// Launcher-side halves of the drain markers.
///
/// Each fires once when its stream reaches end of file. Dropping a sender
/// without firing counts as drained, so a process that never started does
/// not hold up the coordinator.
#[derive(Debug)]
pub struct DrainSignals {
    pub stdout: oneshot::Sender<()>,
    pub stderr: oneshot::Sender<()>,
}

impl Instance {
    pub fn new(process: impl Into<String>) -> (Self, DrainSignals) {
        let (stdout_tx, stdout_rx) = oneshot::channel();
        let (stderr_tx, stderr_rx) = oneshot::channel();
        let instance = Self {
            process: process.into(),
            stdout_drained: stdout_rx,
            stderr_drained: stderr_rx,
        };
        let signals = DrainSignals {
            stdout: stdout_tx,
            stderr: stderr_tx,
        };
        (instance, signals)
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    /// Wait until both output streams are drained.
    pub async fn drained(self) {
        // A dropped sender means the stream will never produce anything.
        let _ = self.stdout_drained.await;
        let _ = self.stderr_drained.await;
    }
}

/// Start `spec`, drain its output into `sink`, and wait for it to exit.
///
/// With `limit` set, the exit wait races a deadline; on expiry the process
/// is killed and reaped. Its own children are not killed: they stay in the
/// shared process group so a terminal interrupt still reaches them.
pub async fn run_process(
    spec: LaunchSpec,
    signals: DrainSignals,
    sink: Arc<dyn LineSink>,
    limit: Option<Duration>,
    verbosity: Verbosity,
) -> ExitOutcome {
    let mut command = Command::new(&spec.component);
    command
        .arg0(&spec.name)
        .args(spec.args.to_argv())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExitOutcome::Failed(RuntimeError::Spawn {
                process: spec.name,
                component: spec.component,
                source: e,
            })
        }
    };
    debug!(process = %spec.name, pid = ?child.id(), "spawned");

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        (stdout, _) => {
            let stream = if stdout.is_none() { "stdout" } else { "stderr" };
            if let Err(e) = child.kill().await {
                warn!(process = %spec.name, error = %e, "could not kill process");
            }
            return ExitOutcome::Failed(RuntimeError::StdioUnavailable {
                process: spec.name,
                stream,
            });
        }
    };

    let name: Arc<str> = Arc::from(spec.name.as_str());
    tokio::spawn(drain(
        stdout,
        Arc::clone(&name),
        StreamKind::Stdout,
        Arc::clone(&sink),
        signals.stdout,
    ));
    tokio::spawn(drain(
        stderr,
        Arc::clone(&name),
        StreamKind::Stderr,
        sink,
        signals.stderr,
    ));

    let waited = match limit {
        None => child.wait().await,
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(waited) => waited,
            Err(_) => {
                warn!(process = %name, timeout = ?limit, "process timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(process = %name, error = %e, "could not kill process");
                }
                return ExitOutcome::TimedOut;
            }
        },
    };

    match waited {
        Ok(status) if status.success() => {
            if !verbosity.is_quiet() {
                info!(process = %name, "process exited normally");
            }
            ExitOutcome::Exited(status)
        }
        Ok(status) => {
            error!(process = %name, %status, "process exited unsuccessfully");
            ExitOutcome::Exited(status)
        }
        Err(e) => ExitOutcome::Failed(RuntimeError::Wait {
            process: spec.name,
            source: e,
        }),
    }
}

/// Copy `reader` line by line into `sink`, then fire `done`.
async fn drain<R>(
    reader: R,
    process: Arc<str>,
    stream: StreamKind,
    sink: Arc<dyn LineSink>,
    done: oneshot::Sender<()>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                sink.line(&process, stream, &String::from_utf8_lossy(line));
            }
            Err(e) => {
                warn!(%process, stream = stream.as_str(), error = %e, "reading component output failed");
                break;
            }
        }
    }
    debug!(%process, stream = stream.as_str(), "drained");
    let _ = done.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;

    fn shell(name: &str, script: &str) -> LaunchSpec {
        LaunchSpec {
            name: name.to_string(),
            component: "/bin/sh".to_string(),
            pipes: ProcessPipes::default(),
            args: PortArgs::new().with_free(["-c", script]),
        }
    }

    async fn run(spec: LaunchSpec, limit: Option<Duration>) -> (ExitOutcome, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let (instance, signals) = Instance::new(&spec.name);
        let outcome = run_process(spec, signals, sink.clone(), limit, Verbosity::Normal).await;
        instance.drained().await;
        (outcome, sink)
    }

    #[test]
    fn test_argv_starts_with_process_name() {
        let spec = LaunchSpec {
            name: "B".into(),
            component: "./print".into(),
            pipes: ProcessPipes::default(),
            args: PortArgs::new().with_inport("IN", "/dev/shm/B.IN"),
        };
        let argv: Vec<_> = spec.argv().into_iter().map(|s| s.into_string().unwrap()).collect();
        assert_eq!(argv, ["B", "-inport", "IN", "-inpath", "/dev/shm/B.IN"]);
    }

    #[tokio::test]
    async fn test_output_lines_prefixed_and_drained() {
        let (outcome, sink) = run(
            shell("Echo", "echo first; echo second >&2; printf 'no newline'"),
            None,
        )
        .await;

        assert!(matches!(outcome, ExitOutcome::Exited(status) if status.success()));
        let mut lines = sink.rendered("Echo");
        lines.sort();
        assert_eq!(lines, ["Echo: first", "Echo: no newline", "Echo: second"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_reported() {
        let (outcome, _) = run(shell("Fail", "exit 3"), None).await;
        assert!(matches!(outcome, ExitOutcome::Exited(status) if status.code() == Some(3)));
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_lossy() {
        let (_, sink) = run(shell("Bin", "printf 'ok\\377\\n'"), None).await;
        assert_eq!(sink.rendered("Bin"), ["Bin: ok\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_process_sees_its_name_as_argv0() {
        let (_, sink) = run(shell("Named", "echo \"$0\""), None).await;
        // `sh -c` puts the first operand after the script into $0; with
        // none given it keeps argv[0].
        assert_eq!(sink.rendered("Named"), ["Named: Named"]);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let spec = LaunchSpec {
            name: "Ghost".into(),
            component: "/nonexistent/flowd-component".into(),
            pipes: ProcessPipes::default(),
            args: PortArgs::new(),
        };
        let (outcome, sink) = run(spec, None).await;
        assert!(matches!(outcome, ExitOutcome::Failed(RuntimeError::Spawn { .. })));
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = std::time::Instant::now();
        let (outcome, _) = run(
            shell("Sleeper", "exec sleep 30"),
            Some(Duration::from_millis(200)),
        )
        .await;

        assert!(matches!(outcome, ExitOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
