use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flowd_network::Network;
use flowd_runtime::Runtime;
use tracing::{info, warn};

use crate::cmd::RunOptions;
use crate::exit::{io_error, runtime_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS, USAGE};
use crate::output::{print_elapsed, print_network, OutputFormat};

/// Launch the network and wait until every component has exited.
///
/// Component failures are logged but do not change the exit code; only
/// errors found before launch do.
pub fn run(network: &Network, opts: RunOptions, format: OutputFormat) -> CliResult<i32> {
    let runtime = Runtime::new(opts.config);
    let specs = runtime
        .plan(network, &opts.boundary)
        .map_err(|err| runtime_error("invalid network", err))?;

    if runtime.config().verbosity.is_debug() {
        print_network(network, &specs, format);
    }

    install_ctrlc_handler()?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start async runtime", err))?;
    let summary = rt.block_on(runtime.launch(specs));

    if let Some(first) = summary.first_failure() {
        info!(
            failed = summary.failed.len(),
            launched = summary.launched,
            first = %first,
            "some processes did not finish successfully"
        );
    }
    if opts.print_time {
        print_elapsed(summary.elapsed, summary.launched, summary.failed.len(), format);
    }
    Ok(SUCCESS)
}

/// Components share the process group and see the interrupt themselves, so
/// the first one only keeps us draining until they are gone.
fn install_ctrlc_handler() -> CliResult<()> {
    let interrupts = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if interrupts.fetch_add(1, Ordering::SeqCst) == 0 {
            warn!("interrupted, waiting for processes to exit (interrupt again to abort)");
        } else {
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration(" 30 ").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_bad_durations() {
        for input in ["", "0", "0ms", "abc", "-5s", "1.5s", "5h"] {
            let err = parse_duration(input).expect_err(input);
            assert_eq!(err.code, USAGE, "{input}");
        }
    }
}
