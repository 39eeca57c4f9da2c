use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use flowd_network::{Network, OutTarget, Process};
use flowd_runtime::LaunchSpec;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Table,
    Json,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Plain
        }
    }
}

#[derive(Serialize)]
struct ProcessOutput<'a> {
    name: &'a str,
    component: &'a str,
    inports: Vec<String>,
    outports: Vec<String>,
    iips: Vec<String>,
    argv: Vec<String>,
}

impl<'a> ProcessOutput<'a> {
    fn new(process: &'a Process, spec: Option<&LaunchSpec>) -> Self {
        let inports = process
            .inports
            .iter()
            .map(|port| match &port.boundary {
                Some(name) => format!("{} <- INPORT.{name}", port.local_port),
                None => port.local_port.clone(),
            })
            .collect();
        let outports = process
            .outports
            .iter()
            .map(|port| match &port.target {
                OutTarget::Process {
                    remote_proc,
                    remote_port,
                } => format!("{} -> {remote_proc}.{remote_port}", port.local_port),
                OutTarget::Boundary(name) => format!("{} -> OUTPORT.{name}", port.local_port),
            })
            .collect();
        let iips = process
            .iips
            .iter()
            .map(|iip| format!("{}: {}", iip.port, iip.data))
            .collect();
        let argv = spec
            .map(|spec| {
                spec.argv()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: &process.name,
            component: &process.component,
            inports,
            outports,
            iips,
            argv,
        }
    }
}

/// Processes, their ports, initial packets and resolved argv.
pub fn print_network(network: &Network, specs: &[LaunchSpec], format: OutputFormat) {
    let rows: Vec<ProcessOutput<'_>> = network
        .processes
        .values()
        .map(|process| {
            let spec = specs.iter().find(|spec| spec.name == process.name);
            ProcessOutput::new(process, spec)
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PROCESS", "COMPONENT", "INPORTS", "OUTPORTS", "IIPS", "ARGV"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.component.to_string(),
                    row.inports.join("\n"),
                    row.outports.join("\n"),
                    row.iips.join("\n"),
                    row.argv.join(" "),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Plain => {
            for row in &rows {
                println!("{} ({})", row.name, row.component);
                for port in &row.inports {
                    println!("  in   {port}");
                }
                for port in &row.outports {
                    println!("  out  {port}");
                }
                for iip in &row.iips {
                    println!("  iip  {iip}");
                }
                println!("  argv {}", row.argv.join(" "));
            }
        }
    }
}

pub fn print_dependencies(deps: &BTreeSet<String>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(deps).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEPENDENCY"]);
            for dep in deps {
                table.add_row(vec![dep.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Plain => {
            for dep in deps {
                println!("{dep}");
            }
        }
    }
}

#[derive(Serialize)]
struct ElapsedOutput {
    elapsed_ms: u128,
    launched: usize,
    failed: usize,
}

pub fn print_elapsed(elapsed: Duration, launched: usize, failed: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ElapsedOutput {
                elapsed_ms: elapsed.as_millis(),
                launched,
                failed,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Plain => {
            println!("time: {}", format_elapsed(elapsed));
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{elapsed:.3?}")
}
