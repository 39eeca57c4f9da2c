//! Pipe topology: which filesystem path each port of each process uses.
//!
//! Internal edges get a FIFO named after the *receiving* `(process, port)`,
//! so both ends compute the same path independently. Graph-boundary ports
//! use the paths handed to the orchestrator itself and never get a FIFO.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flowd_pipe::{fifo_path, NamedPipe, PipeError, PortArgs};
use tracing::{debug, warn};

use crate::error::{NetworkError, Result};
use crate::model::{Network, OutTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeKind {
    /// A FIFO synthesized for an internal edge.
    Fifo,
    /// A path supplied for the named network port.
    Boundary(String),
}

/// One port bound to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub port: String,
    pub path: PathBuf,
    pub kind: PipeKind,
}

/// All port bindings of one process, in port declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessPipes {
    pub inports: Vec<PortBinding>,
    pub outports: Vec<PortBinding>,
}

impl ProcessPipes {
    /// Inports this process is responsible for creating a FIFO for.
    pub fn owned_fifos(&self) -> impl Iterator<Item = &PortBinding> {
        self.inports
            .iter()
            .filter(|binding| binding.kind == PipeKind::Fifo)
    }

    /// Create (or recreate) the FIFOs of this process's internal inports.
    pub fn create_fifos(&self, mode: u32) -> std::result::Result<Vec<NamedPipe>, PipeError> {
        self.owned_fifos()
            .map(|binding| NamedPipe::create(&binding.path, mode))
            .collect()
    }

    /// The component argv for these bindings plus `free` arguments.
    pub fn port_args(&self, free: Vec<String>) -> PortArgs {
        let mut args = PortArgs::new();
        for binding in &self.inports {
            args = args.with_inport(&binding.port, &binding.path);
        }
        for binding in &self.outports {
            args = args.with_outport(&binding.port, &binding.path);
        }
        args.with_free(free)
    }
}

/// Path plan for a whole network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pipe_dir: PathBuf,
    processes: BTreeMap<String, ProcessPipes>,
}

impl Topology {
    /// Bind every port of `network`.
    ///
    /// `boundary` holds the paths given to the orchestrator for the
    /// network's own inports and outports; each declared boundary port
    /// must have one.
    pub fn plan(network: &Network, pipe_dir: impl Into<PathBuf>, boundary: &PortArgs) -> Result<Self> {
        let pipe_dir = pipe_dir.into();
        let mut processes = BTreeMap::new();
        let mut fifo_owners: BTreeMap<PathBuf, String> = BTreeMap::new();

        for process in network.processes.values() {
            let mut pipes = ProcessPipes::default();

            for inport in &process.inports {
                let binding = match &inport.boundary {
                    Some(name) => PortBinding {
                        port: inport.local_port.clone(),
                        path: supplied(boundary.inport(name), "inport", name)?,
                        kind: PipeKind::Boundary(name.clone()),
                    },
                    None => {
                        let path = fifo_path(&pipe_dir, &process.name, &inport.local_port);
                        let owner = format!("{:?} port {:?}", process.name, inport.local_port);
                        if let Some(first) = fifo_owners.insert(path.clone(), owner.clone()) {
                            return Err(NetworkError::FifoPathCollision {
                                path,
                                first,
                                second: owner,
                            });
                        }
                        PortBinding {
                            port: inport.local_port.clone(),
                            path,
                            kind: PipeKind::Fifo,
                        }
                    }
                };
                pipes.inports.push(binding);
            }

            for outport in &process.outports {
                let binding = match &outport.target {
                    OutTarget::Process {
                        remote_proc,
                        remote_port,
                    } => PortBinding {
                        port: outport.local_port.clone(),
                        path: fifo_path(&pipe_dir, remote_proc, remote_port),
                        kind: PipeKind::Fifo,
                    },
                    OutTarget::Boundary(name) => PortBinding {
                        port: outport.local_port.clone(),
                        path: supplied(boundary.outport(name), "outport", name)?,
                        kind: PipeKind::Boundary(name.clone()),
                    },
                };
                pipes.outports.push(binding);
            }

            processes.insert(process.name.clone(), pipes);
        }

        for port in &boundary.inports {
            if !network.inports.contains_key(&port.name) {
                warn!(port = %port.name, "ignoring path for undeclared network inport");
            }
        }
        for port in &boundary.outports {
            if !network.outports.contains_key(&port.name) {
                warn!(port = %port.name, "ignoring path for undeclared network outport");
            }
        }

        debug!(dir = ?pipe_dir, processes = processes.len(), "pipe topology planned");
        Ok(Self {
            pipe_dir,
            processes,
        })
    }

    pub fn pipe_dir(&self) -> &Path {
        &self.pipe_dir
    }

    pub fn process(&self, name: &str) -> Option<&ProcessPipes> {
        self.processes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessPipes)> {
        self.processes.iter().map(|(name, pipes)| (name.as_str(), pipes))
    }

    /// Number of FIFOs a run creates.
    pub fn fifo_count(&self) -> usize {
        self.processes.values().map(|p| p.owned_fifos().count()).sum()
    }
}

fn supplied(path: Option<&Path>, direction: &'static str, name: &str) -> Result<PathBuf> {
    path.map(Path::to_path_buf)
        .ok_or_else(|| NetworkError::MissingBoundaryPath {
            direction,
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphDefinition;

    fn two_stage() -> Network {
        let graph = GraphDefinition::new()
            .process("A", "./emit")
            .process("B", "./print")
            .connect("A", "OUT", "B", "IN");
        Network::from_graph(&graph).unwrap()
    }

    #[test]
    fn test_edge_ends_share_one_path() {
        let topology = Topology::plan(&two_stage(), "/dev/shm", &PortArgs::new()).unwrap();

        let a = topology.process("A").unwrap();
        let b = topology.process("B").unwrap();
        assert_eq!(a.outports[0].path, b.inports[0].path);
        assert_eq!(b.inports[0].path, PathBuf::from("/dev/shm/B.IN"));
        assert_eq!(topology.fifo_count(), 1);
        assert_eq!(a.owned_fifos().count(), 0);
    }

    #[test]
    fn test_dotted_names_sharing_a_fifo_rejected() {
        let graph = GraphDefinition::new()
            .process("src", "./emit")
            .process("x.y", "./print")
            .process("x", "./print")
            .connect("src", "OUT", "x.y", "z")
            .connect("src", "ERR", "x", "y.z");
        let network = Network::from_graph(&graph).unwrap();

        let err = Topology::plan(&network, "/dev/shm", &PortArgs::new()).unwrap_err();
        match err {
            NetworkError::FifoPathCollision { path, first, second } => {
                assert_eq!(path, PathBuf::from("/dev/shm/x.y.z"));
                // Processes are visited in name order.
                assert_eq!(first, r#""x" port "y.z""#);
                assert_eq!(second, r#""x.y" port "z""#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_port_args_match_argv_contract() {
        let topology = Topology::plan(&two_stage(), "/dev/shm", &PortArgs::new()).unwrap();

        let a_args = topology.process("A").unwrap().port_args(vec!["-v".into()]);
        let a_argv: Vec<_> = a_args.to_argv().into_iter().map(|s| s.into_string().unwrap()).collect();
        assert_eq!(a_argv, ["-outport=OUT", "-outpath=/dev/shm/B.IN", "-v"]);

        let b_args = topology.process("B").unwrap().port_args(Vec::new());
        let b_argv: Vec<_> = b_args.to_argv().into_iter().map(|s| s.into_string().unwrap()).collect();
        assert_eq!(b_argv, ["-inport", "IN", "-inpath", "/dev/shm/B.IN"]);
    }

    #[test]
    fn test_boundary_ports_use_supplied_paths() {
        let graph = GraphDefinition::new()
            .process("A", "./filter")
            .inport("SRC", "A", "IN")
            .outport("SINK", "A", "OUT");
        let network = Network::from_graph(&graph).unwrap();
        let supplied = PortArgs::new()
            .with_inport("SRC", "/tmp/outer.in")
            .with_outport("SINK", "/tmp/outer.out");

        let topology = Topology::plan(&network, "/dev/shm", &supplied).unwrap();
        let a = topology.process("A").unwrap();
        assert_eq!(a.inports[0].path, PathBuf::from("/tmp/outer.in"));
        assert_eq!(a.inports[0].kind, PipeKind::Boundary("SRC".into()));
        assert_eq!(a.outports[0].path, PathBuf::from("/tmp/outer.out"));
        assert_eq!(topology.fifo_count(), 0);
    }

    #[test]
    fn test_missing_boundary_path() {
        let graph = GraphDefinition::new()
            .process("A", "./filter")
            .inport("SRC", "A", "IN");
        let network = Network::from_graph(&graph).unwrap();

        let err = Topology::plan(&network, "/dev/shm", &PortArgs::new()).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::MissingBoundaryPath { direction: "inport", ref name } if name == "SRC"
        ));
    }

    #[test]
    fn test_create_fifos_for_receiver_only() {
        let dir = std::env::temp_dir().join(format!(
            "flowd-network-topology-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let topology = Topology::plan(&two_stage(), &dir, &PortArgs::new()).unwrap();
        assert!(topology.process("A").unwrap().create_fifos(0o770).unwrap().is_empty());
        let created = topology.process("B").unwrap().create_fifos(0o770).unwrap();

        assert_eq!(created.len(), 1);
        assert!(NamedPipe::is_fifo(dir.join("B.IN")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
