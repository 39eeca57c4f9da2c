//! # flowd
//!
//! Flow-based programming with plain OS processes. Each component of a
//! network is an executable; connections between components are named pipes
//! carrying self-delimiting frames.
//!
//! This crate re-exports the layers and ships the `flowd` binary:
//!
//! - [`frame`] for reading and writing frames
//! - [`pipe`] for FIFOs and the component command line
//! - [`network`] for loading, validating and reporting on networks
//! - [`runtime`] for launching a network and waiting for it
//!
//! A component written in Rust needs only [`frame`] and [`pipe`]:
//!
//! ```no_run
//! use flowd::frame::{Frame, FrameWriter};
//! use flowd::pipe::{NamedPipe, PortArgs};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = PortArgs::parse(std::env::args_os().skip(1))?;
//! let out = args.outport("OUT").ok_or("no OUT port")?;
//! let mut writer = FrameWriter::new(NamedPipe::at(out).open_writer()?);
//! writer.write_frame(&Frame::data("Greeting", "hello").with_port("OUT"))?;
//! # Ok(())
//! # }
//! ```

/// Frame codec.
pub mod frame {
    pub use flowd_frame::*;
}

/// Named pipes and port arguments.
pub mod pipe {
    pub use flowd_pipe::*;
}

/// Network model, pipe topology and reports.
pub mod network {
    pub use flowd_network::*;
}

/// Process launcher and lifecycle coordinator.
pub mod runtime {
    pub use flowd_runtime::*;
}
