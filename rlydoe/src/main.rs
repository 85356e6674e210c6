use anyhow::Result;
use clap::Parser;
use rlydoe::Cli;
use std::{io, process};

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let stdout = io::stdout();
    if !rlydoe::execute(&cli, &mut stdout.lock())? {
        process::exit(1);
    }
    Ok(())
}
