//! The lifecycle coordinator: counts processes down to zero.

use std::collections::HashMap;
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Verbosity;
use crate::error::{ErrorKind, RuntimeError};
use crate::launcher::{ExitNotice, ExitOutcome, Instance};

/// Why a process counts as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Nonzero exit code, or killed by a signal.
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// Killed after exceeding the process timeout.
    TimedOut,
    /// Could not be started or waited for.
    Error { kind: ErrorKind, message: String },
    /// No exit notice arrived before every launcher task had finished.
    Lost,
}

impl FailureReason {
    fn from_status(status: ExitStatus) -> Self {
        FailureReason::Exited {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Exited {
                code: Some(code), ..
            } => write!(f, "exit code {code}"),
            FailureReason::Exited {
                signal: Some(signal),
                ..
            } => write!(f, "killed by signal {signal}"),
            FailureReason::Exited { .. } => f.write_str("exited unsuccessfully"),
            FailureReason::TimedOut => f.write_str("timed out"),
            FailureReason::Error { kind, message } => write!(f, "{kind} error: {message}"),
            FailureReason::Lost => f.write_str("exit was never reported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub process: String,
    pub reason: FailureReason,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub launched: usize,
    pub succeeded: usize,
    pub failed: Vec<ProcessFailure>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The first failed process, as an error.
    pub fn first_failure(&self) -> Option<RuntimeError> {
        self.failed.first().map(|failure| RuntimeError::ProcessFailure {
            process: failure.process.clone(),
            reason: failure.reason.clone(),
        })
    }
}

/// How long the output of a process killed on timeout may stay open.
///
/// Only the component itself is killed. Children it started keep their
/// copies of its stdout and stderr, and the drains would otherwise wait
/// for them.
pub const KILL_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Waits until every registered process has exited and drained.
///
/// The process table is filled with [`Coordinator::register`] before any
/// launcher task starts; afterwards only [`Coordinator::run`] touches it.
#[derive(Debug)]
pub struct Coordinator {
    instances: HashMap<String, Instance>,
    verbosity: Verbosity,
    kill_drain_grace: Duration,
    started: Instant,
}

impl Coordinator {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            instances: HashMap::new(),
            verbosity,
            kill_drain_grace: KILL_DRAIN_GRACE,
            started: Instant::now(),
        }
    }

    pub fn with_kill_drain_grace(mut self, grace: Duration) -> Self {
        self.kill_drain_grace = grace;
        self
    }

    pub fn register(&mut self, instance: Instance) {
        let name = instance.process().to_string();
        if self.instances.insert(name.clone(), instance).is_some() {
            warn!(process = %name, "process registered twice, keeping the newer instance");
        }
    }

    pub fn outstanding(&self) -> usize {
        self.instances.len()
    }

    /// Consume exit notices until no process is outstanding.
    ///
    /// For each notice, both drain markers of that process are awaited
    /// before it is counted as done; for a process killed on timeout the
    /// wait is bounded by the kill drain grace. Notices for unknown or
    /// already retired processes are ignored.
    pub async fn run(mut self, mut exits: mpsc::UnboundedReceiver<ExitNotice>) -> RunSummary {
        let launched = self.instances.len();
        let mut succeeded = 0;
        let mut failed = Vec::new();

        while !self.instances.is_empty() {
            let Some(notice) = exits.recv().await else {
                error!(
                    outstanding = self.instances.len(),
                    "exit channel closed with processes outstanding"
                );
                for process in self.instances.into_keys() {
                    failed.push(ProcessFailure {
                        process,
                        reason: FailureReason::Lost,
                    });
                }
                break;
            };

            let Some(instance) = self.instances.remove(&notice.process) else {
                warn!(process = %notice.process, "ignoring exit notice for unknown process");
                continue;
            };
            if self.verbosity.is_debug() {
                debug!(process = %notice.process, "waiting for output to drain");
            }
            if matches!(notice.outcome, ExitOutcome::TimedOut) {
                let grace = self.kill_drain_grace;
                if tokio::time::timeout(grace, instance.drained()).await.is_err() {
                    warn!(
                        process = %notice.process,
                        ?grace,
                        "output still held open after kill, no longer waiting for it"
                    );
                }
            } else {
                instance.drained().await;
            }

            match notice.outcome {
                ExitOutcome::Exited(status) if status.success() => succeeded += 1,
                ExitOutcome::Exited(status) => failed.push(ProcessFailure {
                    process: notice.process,
                    reason: FailureReason::from_status(status),
                }),
                ExitOutcome::TimedOut => failed.push(ProcessFailure {
                    process: notice.process,
                    reason: FailureReason::TimedOut,
                }),
                ExitOutcome::Failed(e) => {
                    error!(process = %notice.process, error = %e, "process failed");
                    failed.push(ProcessFailure {
                        process: notice.process,
                        reason: FailureReason::Error {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                    });
                }
            }
        }

        let elapsed = self.started.elapsed();
        if !self.verbosity.is_quiet() {
            info!(
                launched,
                succeeded,
                failed = failed.len(),
                "all processes have exited"
            );
        }
        RunSummary {
            launched,
            succeeded,
            failed,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(process: &str, code: i32) -> ExitNotice {
        ExitNotice {
            process: process.to_string(),
            outcome: ExitOutcome::Exited(ExitStatus::from_raw(code << 8)),
        }
    }

    #[tokio::test]
    async fn test_waits_for_both_drains() {
        let mut coordinator = Coordinator::new(Verbosity::Normal);
        let (instance, signals) = Instance::new("A");
        coordinator.register(instance);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut run = tokio::spawn(coordinator.run(rx));

        tx.send(exited("A", 0)).unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), &mut run).await;
        assert!(pending.is_err(), "completed before any drain");

        signals.stdout.send(()).unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), &mut run).await;
        assert!(pending.is_err(), "completed before stderr drained");

        signals.stderr.send(()).unwrap();
        let summary = run.await.unwrap();
        assert_eq!(summary.launched, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_counts_every_process() {
        let mut coordinator = Coordinator::new(Verbosity::Quiet);
        let mut all_signals = Vec::new();
        for name in ["A", "B", "C"] {
            let (instance, signals) = Instance::new(name);
            coordinator.register(instance);
            all_signals.push(signals);
        }
        assert_eq!(coordinator.outstanding(), 3);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut run = tokio::spawn(coordinator.run(rx));

        // Dropped senders count as drained.
        drop(all_signals);
        tx.send(exited("A", 0)).unwrap();
        tx.send(exited("B", 2)).unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), &mut run).await;
        assert!(pending.is_err(), "completed with C outstanding");

        tx.send(ExitNotice {
            process: "C".into(),
            outcome: ExitOutcome::TimedOut,
        })
        .unwrap();
        let summary = run.await.unwrap();

        assert_eq!(summary.launched, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(
            summary.failed[0],
            ProcessFailure {
                process: "B".into(),
                reason: FailureReason::Exited {
                    code: Some(2),
                    signal: None
                },
            }
        );
        assert_eq!(summary.failed[1].reason, FailureReason::TimedOut);
        let first = summary.first_failure().unwrap();
        assert_eq!(first.kind(), ErrorKind::ProcessFailure);
        assert_eq!(first.to_string(), "process B failed: exit code 2");
    }

    #[tokio::test]
    async fn test_timed_out_process_drain_is_bounded() {
        let mut coordinator =
            Coordinator::new(Verbosity::Normal).with_kill_drain_grace(Duration::from_millis(100));
        let (instance, signals) = Instance::new("Killed");
        coordinator.register(instance);

        let (tx, rx) = mpsc::unbounded_channel();
        let run = tokio::spawn(coordinator.run(rx));

        // `signals` stays alive: something still holds the streams open.
        tx.send(ExitNotice {
            process: "Killed".into(),
            outcome: ExitOutcome::TimedOut,
        })
        .unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("run must not wait on the open streams")
            .unwrap();

        assert_eq!(summary.failed[0].reason, FailureReason::TimedOut);
        drop(signals);
    }

    #[tokio::test]
    async fn test_ignores_unknown_and_duplicate_notices() {
        let mut coordinator = Coordinator::new(Verbosity::Normal);
        for name in ["A", "B"] {
            let (instance, _signals) = Instance::new(name);
            coordinator.register(instance);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut run = tokio::spawn(coordinator.run(rx));

        tx.send(exited("A", 0)).unwrap();
        tx.send(exited("A", 0)).unwrap();
        tx.send(exited("Ghost", 0)).unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), &mut run).await;
        assert!(pending.is_err(), "duplicate notice must not retire B");

        tx.send(exited("B", 0)).unwrap();
        let summary = run.await.unwrap();
        assert_eq!(summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_closed_channel_marks_lost() {
        let mut coordinator = Coordinator::new(Verbosity::Normal);
        let (instance, _signals) = Instance::new("A");
        coordinator.register(instance);

        let (tx, rx) = mpsc::unbounded_channel::<ExitNotice>();
        drop(tx);
        let summary = coordinator.run(rx).await;

        assert_eq!(summary.failed[0].reason, FailureReason::Lost);
    }

    #[tokio::test]
    async fn test_empty_network_finishes_immediately() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let summary = Coordinator::new(Verbosity::Normal).run(rx).await;
        assert_eq!(summary.launched, 0);
        assert!(summary.is_success());
        assert!(summary.first_failure().is_none());
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::Exited {
            code: None,
            signal: Some(9),
        };
        assert_eq!(reason.to_string(), "killed by signal 9");
    }
}
