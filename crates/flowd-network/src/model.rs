use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{NetworkError, Result};
use crate::graph::GraphDefinition;

/// The reserved port whose initial packet becomes free command-line arguments.
pub const ARGS_PORT: &str = "ARGS";

/// A validated network, keyed by process name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Network {
    pub processes: BTreeMap<String, Process>,
    /// Graph-boundary inports by network port name.
    pub inports: BTreeMap<String, BoundaryPort>,
    /// Graph-boundary outports by network port name.
    pub outports: BTreeMap<String, BoundaryPort>,
}

/// A network-level port mapped onto one process port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPort {
    pub name: String,
    pub process: String,
    pub port: String,
}

/// Static definition of one component process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Process {
    pub name: String,
    /// Executable path.
    pub component: String,
    pub metadata: BTreeMap<String, String>,
    pub inports: Vec<InPort>,
    pub outports: Vec<OutPort>,
    pub iips: Vec<Iip>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InPort {
    pub local_port: String,
    /// Network inport feeding this port, if it sits on the graph boundary.
    pub boundary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPort {
    pub local_port: String,
    pub target: OutTarget,
}

/// Where an outport delivers its frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutTarget {
    /// Inport of another process in this network.
    Process {
        remote_proc: String,
        remote_port: String,
    },
    /// A network outport.
    Boundary(String),
}

/// Initial information packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iip {
    pub port: String,
    pub data: String,
}

impl OutPort {
    /// Remote `(process, port)` for internal edges.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match &self.target {
            OutTarget::Process {
                remote_proc,
                remote_port,
            } => Some((remote_proc, remote_port)),
            OutTarget::Boundary(_) => None,
        }
    }
}

impl Process {
    fn new(name: &str, component: String, metadata: BTreeMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            component,
            metadata,
            ..Self::default()
        }
    }

    /// Free command-line arguments from all `ARGS` initial packets, in
    /// declaration order.
    pub fn free_args(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for iip in self.iips.iter().filter(|iip| iip.port == ARGS_PORT) {
            let split = shell_words::split(&iip.data).map_err(|e| NetworkError::InvalidArgs {
                process: self.name.clone(),
                source: e,
            })?;
            args.extend(split);
        }
        Ok(args)
    }

    fn has_inport(&self, port: &str) -> bool {
        self.inports.iter().any(|p| p.local_port == port)
    }
}

impl Network {
    /// Validate a graph definition and build the name-keyed model.
    ///
    /// Fails with a configuration error on the first problem found; nothing
    /// is created on the filesystem.
    pub fn from_graph(graph: &GraphDefinition) -> Result<Self> {
        let mut processes = BTreeMap::new();
        for (name, def) in &graph.processes {
            check_name("process", name)?;
            if def.component.trim().is_empty() {
                return Err(NetworkError::MissingComponent {
                    process: name.clone(),
                });
            }
            let metadata = def
                .metadata
                .iter()
                .map(|(key, value)| {
                    let text = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), text)
                })
                .collect();
            processes.insert(
                name.clone(),
                Process::new(name, def.component.clone(), metadata),
            );
        }

        let mut fed: BTreeSet<(String, String)> = BTreeSet::new();
        for (index, conn) in graph.connections.iter().enumerate() {
            let tgt = &conn.tgt;
            ensure_declared(&processes, &tgt.process, || format!("connection #{index}"))?;
            check_name("port", &tgt.port)?;

            match (&conn.src, conn.data_text()) {
                (Some(src), None) => {
                    ensure_declared(&processes, &src.process, || format!("connection #{index}"))?;
                    check_name("port", &src.port)?;
                    if !fed.insert((tgt.process.clone(), tgt.port.clone())) {
                        return Err(NetworkError::DuplicateInportConnection {
                            process: tgt.process.clone(),
                            port: tgt.port.clone(),
                        });
                    }
                    if let Some(process) = processes.get_mut(&tgt.process) {
                        process.inports.push(InPort {
                            local_port: tgt.port.clone(),
                            boundary: None,
                        });
                    }
                    if let Some(process) = processes.get_mut(&src.process) {
                        process.outports.push(OutPort {
                            local_port: src.port.clone(),
                            target: OutTarget::Process {
                                remote_proc: tgt.process.clone(),
                                remote_port: tgt.port.clone(),
                            },
                        });
                    }
                }
                (None, Some(data)) => {
                    if tgt.port != ARGS_PORT {
                        return Err(NetworkError::UnsupportedIip {
                            process: tgt.process.clone(),
                            port: tgt.port.clone(),
                        });
                    }
                    if let Err(e) = shell_words::split(&data) {
                        return Err(NetworkError::InvalidArgs {
                            process: tgt.process.clone(),
                            source: e,
                        });
                    }
                    if let Some(process) = processes.get_mut(&tgt.process) {
                        process.iips.push(Iip {
                            port: tgt.port.clone(),
                            data,
                        });
                    }
                }
                (Some(_), Some(_)) => {
                    return Err(NetworkError::MalformedConnection {
                        index,
                        reason: "has both src and data",
                    })
                }
                (None, None) => {
                    return Err(NetworkError::MalformedConnection {
                        index,
                        reason: "has neither src nor data",
                    })
                }
            }
        }

        let mut inports = BTreeMap::new();
        for (name, target) in &graph.inports {
            check_name("network inport", name)?;
            ensure_declared(&processes, &target.process, || format!("network inport {name:?}"))?;
            check_name("port", &target.port)?;
            let process = processes
                .get_mut(&target.process)
                .ok_or_else(|| unknown(&target.process, name))?;
            if process.has_inport(&target.port) {
                return Err(NetworkError::BoundaryConflict {
                    name: name.clone(),
                    process: target.process.clone(),
                    port: target.port.clone(),
                });
            }
            process.inports.push(InPort {
                local_port: target.port.clone(),
                boundary: Some(name.clone()),
            });
            inports.insert(name.clone(), boundary(name, &target.process, &target.port));
        }

        let mut outports = BTreeMap::new();
        for (name, source) in &graph.outports {
            check_name("network outport", name)?;
            ensure_declared(&processes, &source.process, || format!("network outport {name:?}"))?;
            check_name("port", &source.port)?;
            let process = processes
                .get_mut(&source.process)
                .ok_or_else(|| unknown(&source.process, name))?;
            if process.outports.iter().any(|p| p.local_port == source.port) {
                return Err(NetworkError::BoundaryConflict {
                    name: name.clone(),
                    process: source.process.clone(),
                    port: source.port.clone(),
                });
            }
            process.outports.push(OutPort {
                local_port: source.port.clone(),
                target: OutTarget::Boundary(name.clone()),
            });
            outports.insert(name.clone(), boundary(name, &source.process, &source.port));
        }

        debug!(
            processes = processes.len(),
            inports = inports.len(),
            outports = outports.len(),
            "network model built"
        );
        Ok(Self {
            processes,
            inports,
            outports,
        })
    }

    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.get(name)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Number of internal edges, i.e. FIFOs a run will create.
    pub fn edge_count(&self) -> usize {
        self.processes
            .values()
            .flat_map(|p| &p.inports)
            .filter(|p| p.boundary.is_none())
            .count()
    }
}

/// A name must work as a single path component: FIFOs are named
/// `<process>.<port>`.
fn check_name(kind: &'static str, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\0'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(NetworkError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn ensure_declared(
    processes: &BTreeMap<String, Process>,
    name: &str,
    context: impl FnOnce() -> String,
) -> Result<()> {
    if processes.contains_key(name) {
        Ok(())
    } else {
        Err(NetworkError::UnknownProcess {
            process: name.to_string(),
            context: context(),
        })
    }
}

fn unknown(process: &str, port_name: &str) -> NetworkError {
    NetworkError::UnknownProcess {
        process: process.to_string(),
        context: format!("network port {port_name:?}"),
    }
}

fn boundary(name: &str, process: &str, port: &str) -> BoundaryPort {
    BoundaryPort {
        name: name.to_string(),
        process: process.to_string(),
        port: port.to_string(),
    }
}
