//! Launch and supervise a flowd network.
//!
//! [`Runtime::run`] plans the pipe topology, creates every FIFO, starts one
//! OS process per component and returns once every process has exited and
//! both of its output streams have been drained.
//!
//! Each process is handled by one task waiting for its exit and two tasks
//! draining stdout and stderr. They report to a single [`Coordinator`]
//! through one-shot drain signals and one exit-notification channel.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod launcher;
pub mod runtime;
pub mod sink;

pub use config::{RuntimeConfig, Verbosity};
pub use coordinator::{Coordinator, FailureReason, ProcessFailure, RunSummary, KILL_DRAIN_GRACE};
pub use error::{ErrorKind, Result, RuntimeError};
pub use launcher::{run_process, DrainSignals, ExitNotice, ExitOutcome, Instance, LaunchSpec};
pub use runtime::Runtime;
pub use sink::{CollectingSink, LineSink, StdoutSink, StreamKind};
