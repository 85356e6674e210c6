//! `rlydoe provision`
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use log::warn;
use rlydoe_provision::{execute, DryRunRunner, NativeRunner, PlanReport, ProvisionPlan};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Output format of `rlydoe provision render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    /// A Dockerfile.
    Dockerfile,
    /// A YAML plan.
    Yaml,
}

/// Subcommands of `rlydoe provision`. Plans are read from a Dockerfile or
/// from a YAML file (`.yaml`, `.yml`).
#[derive(Subcommand, Debug)]
pub enum ProvisionCommand {
    /// Checks step ordering and download integrity
    Check {
        /// Dockerfile or YAML plan
        path: PathBuf,
    },

    /// Prints the plan in another format
    Render {
        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Dockerfile)]
        format: PlanFormat,

        /// Dockerfile or YAML plan
        path: PathBuf,
    },

    /// Performs the steps on this machine, stopping at the first failure
    Apply {
        /// Logs the steps without performing them
        #[arg(long)]
        dry_run: bool,

        /// Dockerfile or YAML plan
        path: PathBuf,
    },
}

pub(crate) fn provision(command: &ProvisionCommand, out: &mut dyn Write) -> Result<bool> {
    match command {
        ProvisionCommand::Check { path } => {
            let report = PlanReport::check(&ProvisionPlan::from_path(path)?);
            write!(out, "{}: {}", path.display(), report)?;
            Ok(report.is_ok())
        }
        ProvisionCommand::Render { format, path } => {
            let plan = ProvisionPlan::from_path(path)?;
            match format {
                PlanFormat::Dockerfile => out.write_all(plan.to_dockerfile().as_bytes())?,
                PlanFormat::Yaml => out.write_all(serde_yaml::to_string(&plan)?.as_bytes())?,
            }
            Ok(true)
        }
        ProvisionCommand::Apply { dry_run, path } => {
            let plan = ProvisionPlan::from_path(path)?;
            let report = PlanReport::check(&plan);
            if !report.is_ok() {
                write!(out, "{}: {}", path.display(), report)?;
                writeln!(out, "Nothing was run")?;
                return Ok(false);
            }
            for finding in report.warnings() {
                warn!("{}", finding);
            }

            let n = if *dry_run {
                let mut runner = DryRunRunner::default();
                let n = execute(&plan, &mut runner)?;
                for step in runner.steps() {
                    writeln!(out, "{}", step)?;
                }
                n
            } else {
                let context = path.parent().filter(|p| !p.as_os_str().is_empty());
                let mut runner = NativeRunner::new(context.unwrap_or_else(|| Path::new(".")))?;
                execute(&plan, &mut runner)?
            };
            writeln!(out, "{} step(s) done on top of {}", n, plan.base_image)?;
            Ok(true)
        }
    }
}
