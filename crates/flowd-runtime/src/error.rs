use std::fmt;

use crate::coordinator::FailureReason;

/// Closed classification of runtime errors, for branching without
/// inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad network definition or arguments; nothing was launched.
    Configuration,
    /// A FIFO, stdio pipe or process could not be set up.
    Resource,
    /// Incoming frame could not be parsed.
    Parse,
    /// Outgoing frame could not be written.
    Marshal,
    /// A component exited unsuccessfully or timed out.
    ProcessFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Resource => "resource",
            ErrorKind::Parse => "parse",
            ErrorKind::Marshal => "marshal",
            ErrorKind::ProcessFailure => "process failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Invalid network or boundary configuration.
    #[error(transparent)]
    Network(#[from] flowd_network::NetworkError),

    /// A FIFO for one of the process's inports could not be created.
    #[error("process {process}: {source}")]
    Fifo {
        process: String,
        source: flowd_pipe::PipeError,
    },

    /// The component executable could not be started.
    #[error("could not start {process} ({component}): {source}")]
    Spawn {
        process: String,
        component: String,
        source: std::io::Error,
    },

    /// A captured output stream was not available after spawn.
    #[error("could not capture {stream} of {process}")]
    StdioUnavailable {
        process: String,
        stream: &'static str,
    },

    /// Waiting for the process to exit failed.
    #[error("waiting for exit of {process} failed: {source}")]
    Wait {
        process: String,
        source: std::io::Error,
    },

    /// The component did not finish successfully.
    #[error("process {process} failed: {reason}")]
    ProcessFailure {
        process: String,
        reason: FailureReason,
    },

    /// Frame codec error.
    #[error(transparent)]
    Frame(#[from] flowd_frame::FrameError),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Network(_) => ErrorKind::Configuration,
            RuntimeError::Fifo { .. }
            | RuntimeError::Spawn { .. }
            | RuntimeError::StdioUnavailable { .. }
            | RuntimeError::Wait { .. } => ErrorKind::Resource,
            RuntimeError::ProcessFailure { .. } => ErrorKind::ProcessFailure,
            RuntimeError::Frame(e) if e.is_parse_error() || e.is_end_of_stream() => ErrorKind::Parse,
            RuntimeError::Frame(_) => ErrorKind::Marshal,
        }
    }

    /// Name of the process the error belongs to, if any.
    pub fn process(&self) -> Option<&str> {
        match self {
            RuntimeError::Fifo { process, .. }
            | RuntimeError::Spawn { process, .. }
            | RuntimeError::StdioUnavailable { process, .. }
            | RuntimeError::Wait { process, .. }
            | RuntimeError::ProcessFailure { process, .. } => Some(process),
            RuntimeError::Network(_) | RuntimeError::Frame(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let config = RuntimeError::from(flowd_network::NetworkError::UnsupportedIip {
            process: "A".into(),
            port: "CONF".into(),
        });
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.process(), None);

        let spawn = RuntimeError::Spawn {
            process: "A".into(),
            component: "./missing".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.kind(), ErrorKind::Resource);
        assert_eq!(spawn.process(), Some("A"));

        let parse = RuntimeError::from(flowd_frame::FrameError::MissingHeader("Type"));
        assert_eq!(parse.kind(), ErrorKind::Parse);

        let empty_type = RuntimeError::from(flowd_frame::FrameError::EmptyTypePart("data.".into()));
        assert_eq!(empty_type.kind(), ErrorKind::Parse);

        let bad_outgoing = RuntimeError::from(flowd_frame::FrameError::InvalidType {
            frame_type: "data".into(),
            body_type: String::new(),
        });
        assert_eq!(bad_outgoing.kind(), ErrorKind::Marshal);

        let marshal = RuntimeError::from(flowd_frame::FrameError::ReservedExtension("Port".into()));
        assert_eq!(marshal.kind(), ErrorKind::Marshal);

        let failed = RuntimeError::ProcessFailure {
            process: "B".into(),
            reason: FailureReason::TimedOut,
        };
        assert_eq!(failed.kind(), ErrorKind::ProcessFailure);
        assert_eq!(failed.to_string(), "process B failed: timed out");
    }
}
