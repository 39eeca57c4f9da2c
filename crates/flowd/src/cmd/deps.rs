use flowd_network::{dependencies, Network};

use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_dependencies, OutputFormat};

pub fn run(network: &Network, format: OutputFormat) -> CliResult<i32> {
    print_dependencies(&dependencies(network), format);
    Ok(SUCCESS)
}
