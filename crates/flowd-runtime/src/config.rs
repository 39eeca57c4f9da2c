use std::path::PathBuf;
use std::time::Duration;

use flowd_pipe::{DEFAULT_FIFO_MODE, DEFAULT_PIPE_DIR};

/// How much the runtime reports about the lifecycle of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet,
    #[default]
    Normal,
    /// Adds per-process argv and drain details.
    Debug,
}

impl Verbosity {
    pub fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }

    pub fn is_debug(self) -> bool {
        self == Verbosity::Debug
    }
}

/// Settings for one run, passed explicitly into [`crate::Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub verbosity: Verbosity,
    /// Directory FIFOs are created in.
    pub pipe_dir: PathBuf,
    /// Permission bits for created FIFOs.
    pub fifo_mode: u32,
    /// Kill a component that runs longer than this.
    pub process_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            pipe_dir: PathBuf::from(DEFAULT_PIPE_DIR),
            fifo_mode: DEFAULT_FIFO_MODE,
            process_timeout: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_pipe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pipe_dir = dir.into();
        self
    }

    pub fn with_process_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.process_timeout = timeout;
        self
    }
}
