//! FLAT CLI - operator commands for the FLAT project store

use clap::Parser;
use flat_cli::{run, Cli};
use flat_core::ConfigLoader;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli, ConfigLoader::new(), &mut std::io::stdout())
}
