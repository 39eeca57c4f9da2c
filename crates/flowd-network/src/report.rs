//! Derived reports: dependency listing and GraphViz export.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Network, OutTarget};

/// Process metadata key naming an extra dependency of a component.
pub const DEP_METADATA_KEY: &str = "dep";

/// Every component executable plus every `dep` metadata value, deduplicated
/// and sorted.
pub fn dependencies(network: &Network) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for process in network.processes.values() {
        deps.insert(process.component.clone());
        if let Some(dep) = process.metadata.get(DEP_METADATA_KEY) {
            if !dep.is_empty() {
                deps.insert(dep.clone());
            }
        }
    }
    deps
}

/// Render the network as a GraphViz `digraph`.
pub fn to_dot(network: &Network) -> String {
    Dot(network).to_string()
}

/// GraphViz rendering of a network, written straight into any formatter.
pub struct Dot<'a>(pub &'a Network);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = self.0;
        out.write_str("digraph network {\n    rankdir=LR;\n    node [shape=box];\n")?;

        for process in network.processes.values() {
            writeln!(
                out,
                "    {} [label={}];",
                quote(&process.name),
                quote(&format!("{}\n{}", process.name, process.component))
            )?;
        }

        for (name, port) in &network.inports {
            let node = format!("INPORT.{name}");
            writeln!(out, "    {} [shape=cds, label={}];", quote(&node), quote(name))?;
            writeln!(
                out,
                "    {} -> {} [label={}];",
                quote(&node),
                quote(&port.process),
                quote(&port.port)
            )?;
        }

        for process in network.processes.values() {
            for outport in &process.outports {
                match &outport.target {
                    OutTarget::Process {
                        remote_proc,
                        remote_port,
                    } => writeln!(
                        out,
                        "    {} -> {} [label={}];",
                        quote(&process.name),
                        quote(remote_proc),
                        quote(&format!("{} -> {}", outport.local_port, remote_port))
                    )?,
                    OutTarget::Boundary(name) => {
                        let node = format!("OUTPORT.{name}");
                        writeln!(out, "    {} [shape=cds, label={}];", quote(&node), quote(name))?;
                        writeln!(
                            out,
                            "    {} -> {} [label={}];",
                            quote(&process.name),
                            quote(&node),
                            quote(&outport.local_port)
                        )?;
                    }
                }
            }
        }

        for process in network.processes.values() {
            for (index, iip) in process.iips.iter().enumerate() {
                let node = format!("IIP.{}.{index}", process.name);
                writeln!(
                    out,
                    "    {} [shape=plaintext, label={}];",
                    quote(&node),
                    quote(&format!("'{}'", iip.data))
                )?;
                writeln!(
                    out,
                    "    {} -> {} [label={}, style=dashed];",
                    quote(&node),
                    quote(&process.name),
                    quote(&iip.port)
                )?;
            }
        }

        out.write_str("}\n")
    }
}

/// DOT double-quoted string.
fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
