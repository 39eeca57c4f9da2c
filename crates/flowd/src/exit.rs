use std::fmt;
use std::io;

use flowd_network::NetworkError;
use flowd_runtime::{ErrorKind, RuntimeError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const RESOURCE: i32 = 3;
pub const CONFIG_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
/// Second interrupt while components are still running.
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

/// Network errors are all raised before launch, so they are configuration
/// problems.
pub fn network_error(context: &str, err: NetworkError) -> CliError {
    CliError::new(CONFIG_INVALID, format!("{context}: {err}"))
}

pub fn runtime_error(context: &str, err: RuntimeError) -> CliError {
    let code = match err.kind() {
        ErrorKind::Configuration => CONFIG_INVALID,
        ErrorKind::Resource => RESOURCE,
        ErrorKind::Parse | ErrorKind::Marshal | ErrorKind::ProcessFailure => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_config_invalid() {
        let err = NetworkError::MissingComponent {
            process: "A".to_string(),
        };
        assert_eq!(network_error("load", err).code, CONFIG_INVALID);

        let err = RuntimeError::from(NetworkError::UnsupportedIip {
            process: "A".to_string(),
            port: "IN".to_string(),
        });
        let cli = runtime_error("plan", err);
        assert_eq!(cli.code, CONFIG_INVALID);
        assert!(cli.message.starts_with("plan: "));
    }

    #[test]
    fn fifo_errors_map_to_resource() {
        let err = RuntimeError::Fifo {
            process: "B".to_string(),
            source: flowd_pipe::PipeError::NotAFifo {
                path: "/tmp/B.IN".into(),
            },
        };
        let cli = runtime_error("launch", err);
        assert_eq!(cli.code, RESOURCE);
        assert!(cli.message.contains("B.IN"));
    }
}
