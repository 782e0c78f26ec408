// The matflow command line tool.

use clap::Parser;
use matflow::cli::{init_logging, run, Cli};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    run(&cli, &mut std::io::stdout().lock())
}
