//! Parsed network definitions in the FBP JSON graph format.
//!
//! ```json
//! {
//!   "processes": { "A": { "component": "./emit", "metadata": { "dep": "libfoo" } } },
//!   "connections": [
//!     { "src": { "process": "A", "port": "OUT" }, "tgt": { "process": "B", "port": "IN" } },
//!     { "data": "-n 5", "tgt": { "process": "A", "port": "ARGS" } }
//!   ],
//!   "inports": { "SOURCE": { "process": "A", "port": "IN" } },
//!   "outports": {}
//! }
//! ```
//!
//! Unknown keys (`properties`, `groups`, layout metadata) are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessDefinition>,
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,
    #[serde(default)]
    pub inports: BTreeMap<String, PortRef>,
    #[serde(default)]
    pub outports: BTreeMap<String, PortRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Executable to launch for this process.
    pub component: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Either an edge (`src` set) or an initial packet (`data` set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<PortRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub tgt: PortRef,
}

impl ConnectionDefinition {
    /// Initial packet text. Strings are used verbatim, other JSON values in
    /// their compact JSON form.
    pub fn data_text(&self) -> Option<String> {
        self.data.as_ref().map(|value| match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub process: String,
    pub port: String,
}

impl PortRef {
    pub fn new(process: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
        }
    }
}

impl GraphDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| NetworkError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&text)
    }

    /// Declare a process.
    pub fn process(mut self, name: impl Into<String>, component: impl Into<String>) -> Self {
        self.processes.insert(
            name.into(),
            ProcessDefinition {
                component: component.into(),
                metadata: BTreeMap::new(),
            },
        );
        self
    }

    /// Attach a metadata entry to an already declared process.
    pub fn metadata(mut self, process: &str, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(def) = self.processes.get_mut(process) {
            def.metadata
                .insert(key.into(), serde_json::Value::String(value.into()));
        }
        self
    }

    /// Wire `src_process.src_port` to `tgt_process.tgt_port`.
    pub fn connect(
        mut self,
        src_process: impl Into<String>,
        src_port: impl Into<String>,
        tgt_process: impl Into<String>,
        tgt_port: impl Into<String>,
    ) -> Self {
        self.connections.push(ConnectionDefinition {
            src: Some(PortRef::new(src_process, src_port)),
            data: None,
            tgt: PortRef::new(tgt_process, tgt_port),
        });
        self
    }

    /// Send an initial packet to `process.port`.
    pub fn iip(
        mut self,
        data: impl Into<String>,
        process: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        self.connections.push(ConnectionDefinition {
            src: None,
            data: Some(serde_json::Value::String(data.into())),
            tgt: PortRef::new(process, port),
        });
        self
    }

    /// Expose `process.port` as the network inport `name`.
    pub fn inport(
        mut self,
        name: impl Into<String>,
        process: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        self.inports.insert(name.into(), PortRef::new(process, port));
        self
    }

    /// Expose `process.port` as the network outport `name`.
    pub fn outport(
        mut self,
        name: impl Into<String>,
        process: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        self.outports.insert(name.into(), PortRef::new(process, port));
        self
    }
}
