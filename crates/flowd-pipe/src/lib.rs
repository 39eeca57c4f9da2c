//! Named pipes and the component command line.
//!
//! Two halves of one contract between the orchestrator and its components:
//! - [`NamedPipe`] creates and opens the FIFOs that carry frames
//! - [`PortArgs`] writes and reads the `-inport`/`-inpath`,
//!   `-outport=`/`-outpath=` arguments that tell a component where they are

pub mod args;
pub mod error;

#[cfg(unix)]
pub mod fifo;

pub use args::{PortArg, PortArgs};
pub use error::{PipeError, Result};

#[cfg(unix)]
pub use fifo::{fifo_path, NamedPipe, DEFAULT_FIFO_MODE, DEFAULT_PIPE_DIR};
