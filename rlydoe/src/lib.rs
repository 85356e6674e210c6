//! Command line of the experiment diary.
//!
//! `rlydoe` resolves trainer arguments, checks and runs the run scripts of the
//! diary, and checks or applies the provisioning plan of the training image.
//!
//! ```text
//! rlydoe resolve learner=ppo environment=fetchpickplace learner.total_timesteps=40000000
//! rlydoe check diary/scripts/*.sh
//! rlydoe run --dry-run --ledger runs.csv diary/scripts/fetch.sh
//! rlydoe provision check diary/docker/Dockerfile
//! ```
mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;

pub use commands::{
    check::CheckArgs,
    provision::{PlanFormat, ProvisionCommand},
    resolve::{Format, ResolveArgs},
    run::RunArgs,
};

/// Experiment diary for reinforcement learning training runs
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Raises the log level, `-v` for debug and `-vv` for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolves trainer arguments to the full configuration
    Resolve(ResolveArgs),

    /// Checks run scripts without launching anything
    Check(CheckArgs),

    /// Launches the invocations of a run script in order
    Run(RunArgs),

    /// Checks, renders or applies a provisioning plan
    #[command(subcommand)]
    Provision(ProvisionCommand),
}

impl Cli {
    /// Default log filter for the verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Runs the command of `cli`, writing its report to `out`.
///
/// Returns `false` when the command completed but found problems: a script
/// that does not check, a failed run, or a plan with errors.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    match &cli.command {
        Command::Resolve(args) => commands::resolve::resolve(args, out),
        Command::Check(args) => commands::check::check(args, out),
        Command::Run(args) => commands::run::run(args, out),
        Command::Provision(command) => commands::provision::provision(command, out),
    }
}
