//! Where component output lines go.

use std::io::Write;
use std::sync::Mutex;

/// Which captured stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Receives every line a component writes to stdout or stderr.
///
/// Called concurrently from the drain tasks of all processes.
pub trait LineSink: Send + Sync + 'static {
    fn line(&self, process: &str, stream: StreamKind, line: &str);
}

/// Writes `<process>: <line>` to the orchestrator's stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn line(&self, process: &str, _stream: StreamKind, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{process}: {line}") {
            tracing::debug!(%process, error = %e, "could not write component output");
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(String, StreamKind, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(process, stream, line)` in arrival order.
    pub fn lines(&self) -> Vec<(String, StreamKind, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines of one process, formatted the way [`StdoutSink`] prints them.
    pub fn rendered(&self, process: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(name, _, _)| name == process)
            .map(|(name, _, line)| format!("{name}: {line}"))
            .collect()
    }
}

impl LineSink for CollectingSink {
    fn line(&self, process: &str, stream: StreamKind, line: &str) {
        let entry = (process.to_string(), stream, line.to_string());
        match self.lines.lock() {
            Ok(mut lines) => lines.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.line("A", StreamKind::Stdout, "one");
        sink.line("B", StreamKind::Stderr, "two");
        sink.line("A", StreamKind::Stderr, "three");

        assert_eq!(sink.rendered("A"), ["A: one", "A: three"]);
        assert_eq!(sink.lines()[1].1, StreamKind::Stderr);
    }
}
