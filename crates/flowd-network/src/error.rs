use std::path::PathBuf;

/// Configuration errors, all raised before any process is launched.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The network definition file could not be read.
    #[error("failed to read network definition {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The network definition is not valid FBP JSON.
    #[error("invalid network definition: {0}")]
    Parse(#[from] serde_json::Error),

    /// A connection or boundary port refers to an undeclared process.
    #[error("{context} refers to undeclared process {process:?}")]
    UnknownProcess { process: String, context: String },

    /// A process or port name cannot be used as a path component.
    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },

    /// A process has an empty component path.
    #[error("process {process:?} has no component")]
    MissingComponent { process: String },

    /// A connection has neither or both of `src` and `data`.
    #[error("connection #{index} is malformed: {reason}")]
    MalformedConnection { index: usize, reason: &'static str },

    /// Two connections feed the same inport.
    #[error("inport {process}.{port} is fed by more than one connection")]
    DuplicateInportConnection { process: String, port: String },

    /// A graph-boundary port is also wired to an internal connection.
    #[error("boundary port {name:?} conflicts with a connection on {process}.{port}")]
    BoundaryConflict {
        name: String,
        process: String,
        port: String,
    },

    /// No path was supplied for a graph-boundary port.
    #[error("no path given for network {direction} {name:?} (pass -{direction} {name} with its path)")]
    MissingBoundaryPath {
        direction: &'static str,
        name: String,
    },

    /// An initial packet addresses a port other than `ARGS`.
    #[error("initial packet to {process}.{port} is not supported (only {process}.ARGS)")]
    UnsupportedIip { process: String, port: String },

    /// An `ARGS` initial packet cannot be split into arguments.
    #[error("cannot split ARGS for process {process:?}: {source}")]
    InvalidArgs {
        process: String,
        source: shell_words::ParseError,
    },

    /// Two internal inports map to the same FIFO path, e.g. `x.y`/`z` and
    /// `x`/`y.z`.
    #[error("inports {first} and {second} would share the FIFO {path}")]
    FifoPathCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, NetworkError>;
