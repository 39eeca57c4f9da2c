//! Network model for flowd.
//!
//! A [`GraphDefinition`] is the already-parsed graph as loaded from FBP JSON.
//! [`Network::from_graph`] validates it into the name-keyed [`Network`]
//! model, and [`Topology::plan`] decides which path every port is bound to.
//!
//! ```
//! use flowd_network::{GraphDefinition, Network};
//!
//! let graph = GraphDefinition::new()
//!     .process("A", "./emit")
//!     .process("B", "./print")
//!     .connect("A", "OUT", "B", "IN");
//! let network = Network::from_graph(&graph).unwrap();
//! assert_eq!(network.processes["B"].inports[0].local_port, "IN");
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod report;
#[cfg(unix)]
pub mod topology;

pub use error::{NetworkError, Result};
pub use graph::{ConnectionDefinition, GraphDefinition, PortRef, ProcessDefinition};
pub use model::{BoundaryPort, InPort, Iip, Network, OutPort, OutTarget, Process, ARGS_PORT};
pub use report::{dependencies, to_dot, Dot, DEP_METADATA_KEY};
#[cfg(unix)]
pub use topology::{PipeKind, PortBinding, ProcessPipes, Topology};
