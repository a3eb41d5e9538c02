use anyhow::Result;
use clap::Parser;
use env_logger::init;
use gen_instances_cli::cli::Cli;

fn main() -> Result<()> {
    init();
    Cli::parse().command.run()
}
