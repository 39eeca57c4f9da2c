use flowd_network::{to_dot, Network};

use crate::exit::{CliResult, SUCCESS};

pub fn run(network: &Network) -> CliResult<i32> {
    print!("{}", to_dot(network));
    Ok(SUCCESS)
}
