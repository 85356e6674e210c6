//! Sequential launch of the invocations of a run script.
use crate::{
    config::SequencerConfig,
    invocation::{Invocation, Resolution},
    launcher::{DryRunLauncher, Exit, Launcher, ProcessLauncher},
    script::{RunScript, ScriptParser},
};
use anyhow::Result;
use chrono::{DateTime, Local};
use log::{info, warn};
use rlydoe_core::{
    record::{Record, RecordValue, Recorder},
    PresetCatalog, TrainingPlan,
};
use std::{fmt, path::Path, time::Instant};

/// Columns of the run ledger.
pub const LEDGER_COLUMNS: [&str; 8] = [
    "index",
    "line",
    "command",
    "experiment",
    "status",
    "exit_code",
    "start",
    "elapsed_secs",
];

/// What happened to an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The program returned 0.
    Succeeded,

    /// The program returned a non-zero code, was killed, or could not start.
    Failed,

    /// The trainer arguments did not resolve; the program was not started.
    Rejected(String),

    /// Not started because an earlier invocation failed under stop-on-error.
    Skipped,
}

impl Status {
    /// Short lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Rejected(_) => "rejected",
            Self::Skipped => "skipped",
        }
    }

    fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Rejected(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Index of the invocation.
    pub index: usize,

    /// Line of the invocation.
    pub line: usize,

    /// Command line.
    pub command: String,

    /// Name of the experiment, for trainer invocations.
    pub experiment: Option<String>,

    /// What `trainer-sb3.py` sets up for the run.
    pub plan: Option<TrainingPlan>,

    /// Status.
    pub status: Status,

    /// How the program ended, if it was started.
    pub exit: Option<Exit>,

    /// When the program was started.
    pub start: Option<DateTime<Local>>,

    /// Wall time of the program in seconds.
    pub elapsed_secs: f32,
}

impl RunOutcome {
    fn new(invocation: &Invocation, status: Status) -> Self {
        Self {
            index: invocation.index,
            line: invocation.line,
            command: invocation.command_line(),
            experiment: None,
            plan: None,
            status,
            exit: None,
            start: None,
            elapsed_secs: 0.0,
        }
    }

    /// The ledger row of this outcome.
    ///
    /// For `trainer-sb3.py` runs the record also carries the keys of
    /// [`TrainingPlan::to_record`].
    pub fn to_record(&self) -> Record {
        let mut record = Record::from_slice(&[
            ("index", RecordValue::Scalar(self.index as f32)),
            ("line", RecordValue::Scalar(self.line as f32)),
            ("command", RecordValue::String(self.command.clone())),
            ("status", RecordValue::String(self.status.to_string())),
            ("elapsed_secs", RecordValue::Scalar(self.elapsed_secs)),
        ]);
        if let Some(experiment) = &self.experiment {
            record.insert("experiment", RecordValue::String(experiment.clone()));
        }
        if let Some(code) = self.exit.and_then(|e| e.code()) {
            record.insert("exit_code", RecordValue::Scalar(code as f32));
        }
        if let Some(start) = self.start {
            record.insert("start", RecordValue::DateTime(start));
        }
        match &self.plan {
            Some(plan) => plan.to_record().merge(record),
            None => record,
        }
    }
}

/// Outcomes of a whole script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// One outcome per invocation, in order.
    pub outcomes: Vec<RunOutcome>,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&Status) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }

    /// Number of succeeded invocations.
    pub fn succeeded(&self) -> usize {
        self.count(|s| *s == Status::Succeeded)
    }

    /// Number of failed invocations.
    pub fn failed(&self) -> usize {
        self.count(|s| *s == Status::Failed)
    }

    /// Number of rejected invocations.
    pub fn rejected(&self) -> usize {
        self.count(|s| matches!(s, Status::Rejected(_)))
    }

    /// Number of skipped invocations.
    pub fn skipped(&self) -> usize {
        self.count(|s| *s == Status::Skipped)
    }

    /// Whether every invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.outcomes.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invocations: {} succeeded, {} failed, {} rejected, {} skipped",
            self.outcomes.len(),
            self.succeeded(),
            self.failed(),
            self.rejected(),
            self.skipped()
        )
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Launches the invocations of a run script one after the other.
///
/// # Run loop
///
/// For each [`Invocation`] of the [`RunScript`], in order:
///
/// 1. If an earlier invocation failed and stop-on-error is on, the invocation
///    is [`Status::Skipped`].
/// 2. Trainer arguments are resolved against the [`PresetCatalog`]. An
///    invocation that does not resolve is [`Status::Rejected`] without being
///    started.
/// 3. The [`Launcher`] runs the program and blocks until it ends. Exit code 0
///    is [`Status::Succeeded`], anything else [`Status::Failed`].
/// 4. The [`RunOutcome`] is written to the [`Recorder`] as one record.
///
/// A failure does not stop the loop unless stop-on-error is set in
/// [`SequencerConfig`] or by `set -e` in the script.
///
/// ```mermaid
/// graph LR
///     A[RunScript]-->|Invocation|B[PresetCatalog]
///     B -->|Resolution|C[Launcher]
///     C -->|Exit|D[RunOutcome]
///     D -->|Record|E[Recorder]
/// ```
pub struct Sequencer {
    config: SequencerConfig,
    catalog: PresetCatalog,
}

impl Sequencer {
    /// Creates a sequencer with an explicit preset catalog.
    pub fn new(config: SequencerConfig, catalog: PresetCatalog) -> Self {
        Self { config, catalog }
    }

    /// Creates a sequencer, reading presets from `config.conf_dir` if set.
    pub fn build(config: SequencerConfig) -> Result<Self> {
        let catalog = match &config.conf_dir {
            Some(dir) => PresetCatalog::default().load_dir(dir)?,
            None => PresetCatalog::default(),
        };
        Ok(Self::new(config, catalog))
    }

    /// Configuration.
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Preset catalog used for resolution.
    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    /// Parser honouring the strict flag and the variables of the configuration.
    pub fn parser(&self) -> ScriptParser {
        ScriptParser::default()
            .strict(self.config.strict)
            .variables(self.config.env.clone())
    }

    /// Loads a run script with [`Sequencer::parser`].
    pub fn load_script(&self, path: impl AsRef<Path>) -> Result<RunScript> {
        self.parser().load(path)
    }

    /// Launcher matching the configuration.
    pub fn launcher(&self) -> Box<dyn Launcher> {
        if self.config.dry_run {
            Box::new(DryRunLauncher::default())
        } else {
            let mut launcher = ProcessLauncher::default().env(self.config.env.clone());
            if let Some(dir) = &self.config.workdir {
                launcher = launcher.workdir(dir);
            }
            Box::new(launcher)
        }
    }

    /// Runs every invocation of `script`.
    ///
    /// Errors are returned only when the launcher or the recorder fails;
    /// failing programs are reported in the summary.
    pub fn run(
        &self,
        script: &RunScript,
        launcher: &mut dyn Launcher,
        recorder: &mut dyn Recorder,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut stopped = false;

        for invocation in script.invocations() {
            let outcome = if stopped {
                RunOutcome::new(invocation, Status::Skipped)
            } else {
                self.run_one(invocation, launcher)?
            };

            recorder.write(outcome.to_record())?;
            let stop_on_error = self.config.stop_on_error || invocation.stop_on_error;
            if outcome.status.is_failure() && stop_on_error && !stopped {
                warn!(
                    "Stopping after invocation [{}] at line {}: {}",
                    outcome.index, outcome.line, outcome.status
                );
                stopped = true;
            }
            summary.outcomes.push(outcome);
        }

        recorder.flush()?;
        info!("{}", summary);
        Ok(summary)
    }

    fn run_one(&self, invocation: &Invocation, launcher: &mut dyn Launcher) -> Result<RunOutcome> {
        let resolution = match invocation.resolve(&self.catalog) {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(
                    "Rejected invocation [{}] at line {}: {}",
                    invocation.index, invocation.line, e
                );
                return Ok(RunOutcome::new(invocation, Status::Rejected(e.to_string())));
            }
        };

        let start = Local::now();
        let experiment = resolution.experiment_name(&start);
        let plan = match (&resolution, &experiment) {
            (Resolution::Sb3(resolved), Some(name)) => {
                let plan = TrainingPlan::new(&resolved.config, name.as_str());
                info!(
                    "Experiment {}: {} on {} ({} steps)",
                    name, plan.algorithm, plan.environment, plan.total_timesteps
                );
                Some(plan)
            }
            _ => None,
        };

        let timer = Instant::now();
        let exit = launcher.launch(invocation)?;
        let elapsed_secs = timer.elapsed().as_secs_f32();
        let status = if exit.success() {
            Status::Succeeded
        } else {
            Status::Failed
        };
        info!(
            "Invocation [{}] {} after {:.1}s (exit code {:?})",
            invocation.index,
            status,
            elapsed_secs,
            exit.code()
        );

        Ok(RunOutcome {
            experiment,
            plan,
            exit: Some(exit),
            start: Some(start),
            elapsed_secs,
            ..RunOutcome::new(invocation, status)
        })
    }
}
