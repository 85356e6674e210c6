//! `rlydoe resolve`
use super::catalog;
use anyhow::Result;
use chrono::Local;
use clap::{Args, ValueEnum};
use rlydoe_core::{experiment_name, PpgConfig, TrainingPlan};
use serde::Serialize;
use std::{io::Write, path::PathBuf};

/// Output format of `rlydoe resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// YAML, as the presets are written.
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

/// Arguments of `rlydoe resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Directory of preset files, `<dir>/<group>/<preset>.yaml`
    #[arg(long)]
    pub conf_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,

    /// Resolves `ppg.py` flags instead of `trainer-sb3.py` overrides
    #[arg(long)]
    pub ppg: bool,

    /// Also prints what the trainer sets up for the run
    #[arg(long, conflicts_with = "ppg")]
    pub plan: bool,

    /// Trainer arguments, e.g. `learner=sac learner.total_timesteps=100000`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub overrides: Vec<String>,
}

#[derive(Serialize)]
struct Resolved<'a, T> {
    experiment_name: String,
    keys: Vec<&'a str>,
    config: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<TrainingPlan>,
}

fn write<T: Serialize>(out: &mut dyn Write, value: &T, format: Format) -> Result<()> {
    match format {
        Format::Yaml => out.write_all(serde_yaml::to_string(value)?.as_bytes())?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub(crate) fn resolve(args: &ResolveArgs, out: &mut dyn Write) -> Result<bool> {
    let now = Local::now();

    if args.ppg {
        let resolved = PpgConfig::resolve(&args.overrides)?;
        let output = Resolved {
            experiment_name: resolved.config.experiment_name(&now),
            keys: resolved.keys(),
            config: &resolved.config,
            plan: None,
        };
        write(out, &output, args.format)?;
    } else {
        let resolved = catalog(args.conf_dir.as_deref())?.resolve(&args.overrides)?;
        let name = experiment_name(&resolved.config, &now);
        let plan = args
            .plan
            .then(|| TrainingPlan::new(&resolved.config, name.as_str()));
        let output = Resolved {
            experiment_name: name,
            keys: resolved.keys(),
            config: &resolved.config,
            plan,
        };
        write(out, &output, args.format)?;
    }

    Ok(true)
}
