//! `rlydoe run`
use anyhow::{Context, Result};
use clap::Args;
use log::info;
use rlydoe_core::record::{CsvRecorder, NullRecorder, Recorder};
use rlydoe_sequencer::{Sequencer, SequencerConfig, LEDGER_COLUMNS};
use std::{io::Write, path::PathBuf};

/// Arguments of `rlydoe run`.
///
/// Flags override the values of the configuration file.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Sequencer configuration (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logs the invocations without launching them
    #[arg(long)]
    pub dry_run: bool,

    /// Skips the remaining invocations after the first failure
    #[arg(long)]
    pub stop_on_error: bool,

    /// Fails on `\` followed by whitespace instead of joining the lines
    #[arg(long)]
    pub strict: bool,

    /// Working directory of launched programs [default: directory of the script]
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// CSV file receiving one row per invocation
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Directory of preset files, `<dir>/<group>/<preset>.yaml`
    #[arg(long)]
    pub conf_dir: Option<PathBuf>,

    /// Run script
    pub script: PathBuf,
}

impl RunArgs {
    fn sequencer_config(&self) -> Result<SequencerConfig> {
        let mut config = match &self.config {
            Some(path) => SequencerConfig::load(path)
                .with_context(|| format!("Failed to load sequencer config {:?}", path))?,
            None => SequencerConfig::default(),
        };

        if self.dry_run {
            config = config.dry_run(true);
        }
        if self.stop_on_error {
            config = config.stop_on_error(true);
        }
        if self.strict {
            config = config.strict(true);
        }
        if let Some(dir) = &self.workdir {
            config = config.workdir(dir);
        }
        if let Some(path) = &self.ledger {
            config = config.ledger(path);
        }
        if let Some(dir) = &self.conf_dir {
            config = config.conf_dir(dir);
        }

        if config.workdir.is_none() {
            if let Some(dir) = self.script.parent().filter(|p| !p.as_os_str().is_empty()) {
                config = config.workdir(dir);
            }
        }
        Ok(config)
    }
}

pub(crate) fn run(args: &RunArgs, out: &mut dyn Write) -> Result<bool> {
    let sequencer = Sequencer::build(args.sequencer_config()?)?;
    let script = sequencer.load_script(&args.script)?;
    info!(
        "Loaded {} invocation(s) from {:?}",
        script.invocations().len(),
        args.script
    );

    let mut launcher = sequencer.launcher();
    let mut recorder: Box<dyn Recorder> = match &sequencer.config().ledger {
        Some(path) => Box::new(CsvRecorder::new(path, &LEDGER_COLUMNS)?),
        None => Box::new(NullRecorder::default()),
    };
    let summary = sequencer.run(&script, launcher.as_mut(), recorder.as_mut())?;

    for outcome in &summary.outcomes {
        writeln!(
            out,
            "[{}] line {} {}: {}",
            outcome.index, outcome.line, outcome.status, outcome.command
        )?;
    }
    writeln!(out, "{}", summary)?;
    Ok(summary.is_success())
}
