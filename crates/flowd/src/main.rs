mod cmd;
mod exit;
mod logging;
mod output;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use flowd_pipe::{PortArgs, DEFAULT_PIPE_DIR};
use flowd_runtime::{RuntimeConfig, Verbosity};

use crate::cmd::{Action, RunOptions};
use crate::exit::{CliError, CliResult, USAGE};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FLOWD_BUILD_TARGET"),
    ")"
);

/// Boundary ports of the network itself are passed the same way a component
/// receives its ports: `-inport NAME -inpath PATH`, `-outport=NAME -outpath=PATH`.
#[derive(Parser, Debug)]
#[command(
    name = "flowd",
    version,
    long_version = LONG_VERSION,
    about = "Run a flow-based network of component processes wired by named pipes"
)]
struct Cli {
    /// Network definition (FBP JSON graph).
    #[arg(value_name = "NETWORK")]
    network: PathBuf,

    /// Print the network in GraphViz dot format and exit.
    #[arg(long, conflicts_with = "deps")]
    graph: bool,

    /// Print the components and dependencies the network needs and exit.
    #[arg(long)]
    deps: bool,

    /// Print the total run time once every process has exited.
    #[arg(long)]
    time: bool,

    /// Print the network and component command lines before launching.
    #[arg(long, conflicts_with = "quiet")]
    debug: bool,

    /// Only report warnings and errors.
    #[arg(long)]
    quiet: bool,

    /// Kill components that run longer than this (500ms, 5s, 2m or seconds).
    #[arg(long, value_name = "DURATION")]
    timeout: Option<String>,

    /// Directory the named pipes are created in.
    #[arg(long, value_name = "DIR", env = "FLOWD_PIPE_DIR", default_value = DEFAULT_PIPE_DIR)]
    pipe_dir: PathBuf,

    /// Output format for reports.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr); follows --quiet/--debug when unset.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    fn action(&self, boundary: PortArgs) -> CliResult<Action> {
        if self.graph {
            return Ok(Action::Graph);
        }
        if self.deps {
            return Ok(Action::Deps);
        }
        let process_timeout = self
            .timeout
            .as_deref()
            .map(cmd::run::parse_duration)
            .transpose()?;
        let config = RuntimeConfig::default()
            .with_verbosity(self.verbosity())
            .with_pipe_dir(&self.pipe_dir)
            .with_process_timeout(process_timeout);
        Ok(Action::Run(RunOptions {
            boundary,
            config,
            print_time: self.time,
        }))
    }
}

/// Split the boundary port flags off before clap sees the rest.
fn parse_args(args: impl IntoIterator<Item = OsString>) -> CliResult<(Cli, PortArgs)> {
    let mut args = args.into_iter();
    let program = args.next().unwrap_or_else(|| OsString::from("flowd"));
    let (boundary, rest) =
        PortArgs::extract(args).map_err(|err| CliError::new(USAGE, err.to_string()))?;
    let cli = Cli::parse_from(std::iter::once(program).chain(rest));
    Ok((cli, boundary))
}

fn main() {
    let (cli, boundary) = match parse_args(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    };
    init_logging(
        cli.log_format,
        cli.log_level.unwrap_or_else(|| cli.verbosity().into()),
    );

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .action(boundary)
        .and_then(|action| cmd::run(&cli.network, action, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
