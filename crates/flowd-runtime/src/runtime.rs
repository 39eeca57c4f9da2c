use std::sync::Arc;

use flowd_network::{Network, Topology};
use flowd_pipe::PortArgs;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::RuntimeConfig;
use crate::coordinator::{Coordinator, RunSummary};
use crate::error::{Result, RuntimeError};
use crate::launcher::{run_process, ExitNotice, ExitOutcome, Instance, LaunchSpec};
use crate::sink::{LineSink, StdoutSink};

/// Runs networks with one configuration and one output sink.
pub struct Runtime {
    config: RuntimeConfig,
    sink: Arc<dyn LineSink>,
}

impl Runtime {
    /// Runtime printing component output to stdout.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    pub fn with_sink(config: RuntimeConfig, sink: Arc<dyn LineSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Resolve every process's argv without touching the filesystem.
    ///
    /// `boundary` carries the paths of the network's own boundary ports.
    /// All configuration errors surface here, before anything is launched.
    pub fn plan(&self, network: &Network, boundary: &PortArgs) -> Result<Vec<LaunchSpec>> {
        let topology = Topology::plan(network, &self.config.pipe_dir, boundary)?;
        let mut specs = Vec::with_capacity(network.len());
        for process in network.processes.values() {
            let pipes = topology.process(&process.name).cloned().unwrap_or_default();
            let args = pipes.port_args(process.free_args()?);
            specs.push(LaunchSpec {
                name: process.name.clone(),
                component: process.component.clone(),
                pipes,
                args,
            });
        }
        Ok(specs)
    }

    /// Plan, launch and supervise `network` until every process is done.
    pub async fn run(&self, network: &Network, boundary: &PortArgs) -> Result<RunSummary> {
        let specs = self.plan(network, boundary)?;
        Ok(self.launch(specs).await)
    }

    /// Launch already planned processes and wait for all of them.
    ///
    /// FIFOs of every process are created before the first process starts.
    /// A process whose FIFOs cannot be created is reported as failed; its
    /// siblings still run.
    pub async fn launch(&self, specs: Vec<LaunchSpec>) -> RunSummary {
        let verbosity = self.config.verbosity;
        let mut coordinator = Coordinator::new(verbosity);

        let mut pending = Vec::with_capacity(specs.len());
        for spec in specs {
            let prepared = spec
                .pipes
                .create_fifos(self.config.fifo_mode)
                .map(|_| ())
                .map_err(|e| RuntimeError::Fifo {
                    process: spec.name.clone(),
                    source: e,
                });
            let (instance, signals) = Instance::new(&spec.name);
            coordinator.register(instance);
            pending.push((spec, prepared, signals));
        }

        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        for (spec, prepared, signals) in pending {
            if !verbosity.is_quiet() {
                info!(process = %spec.name, component = %spec.component, "launching");
            }
            if verbosity.is_debug() {
                debug!(process = %spec.name, argv = ?spec.argv(), "argv");
            }

            let exits = exit_tx.clone();
            let sink = Arc::clone(&self.sink);
            let limit = self.config.process_timeout;
            tokio::spawn(async move {
                let process = spec.name.clone();
                let outcome = match prepared {
                    Ok(()) => run_process(spec, signals, sink, limit, verbosity).await,
                    Err(e) => {
                        error!(process = %process, error = %e, "could not prepare pipes");
                        drop(signals);
                        ExitOutcome::Failed(e)
                    }
                };
                let _ = exits.send(ExitNotice { process, outcome });
            });
        }
        drop(exit_tx);

        coordinator.run(exit_rx).await
    }
}
