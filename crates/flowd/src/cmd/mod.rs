use std::path::Path;

use flowd_network::{GraphDefinition, Network};
use flowd_pipe::PortArgs;
use flowd_runtime::RuntimeConfig;

use crate::exit::{network_error, CliResult};
use crate::output::OutputFormat;

pub mod deps;
pub mod graph;
pub mod run;

/// What to do with a loaded network.
#[derive(Debug)]
pub enum Action {
    /// Print it as GraphViz.
    Graph,
    /// Print its component dependencies.
    Deps,
    /// Launch it and wait for every process.
    Run(RunOptions),
}

#[derive(Debug)]
pub struct RunOptions {
    /// Paths for the network's own boundary ports.
    pub boundary: PortArgs,
    pub config: RuntimeConfig,
    pub print_time: bool,
}

pub fn run(network_path: &Path, action: Action, format: OutputFormat) -> CliResult<i32> {
    let network = load_network(network_path)?;
    match action {
        Action::Graph => graph::run(&network),
        Action::Deps => deps::run(&network, format),
        Action::Run(opts) => run::run(&network, opts, format),
    }
}

fn load_network(path: &Path) -> CliResult<Network> {
    let graph =
        GraphDefinition::from_path(path).map_err(|err| network_error("failed to load network", err))?;
    Network::from_graph(&graph)
        .map_err(|err| network_error(&format!("invalid network {}", path.display()), err))
}
