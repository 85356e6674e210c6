//! Sequential launcher for the training runs of a diary run script.
//!
//! A run script is a short shell file listing trainer invocations:
//!
//! ```text
//! NUM_TIMESTEPS=$((40 * 1000000))
//! python trainer-sb3.py learner=ppo environment=fetchpickplace \
//!     learner.policy_type=MultiInputPolicy learner.total_timesteps=$NUM_TIMESTEPS
//! ```
//!
//! [`RunScript`] parses such a file into [`Invocation`]s, reporting continuation
//! lines that a shell would silently split. [`ScriptReport`] resolves every
//! trainer invocation against the typed configuration of `rlydoe-core`, and
//! [`Sequencer`] launches the invocations one after the other through a
//! [`Launcher`].
mod arith;
mod check;
mod config;
mod error;
mod invocation;
mod launcher;
mod script;
mod sequencer;

pub use check::{InvocationReport, ScriptReport};
pub use config::SequencerConfig;
pub use error::ScriptError;
pub use invocation::{Invocation, Resolution, TrainerKind};
pub use launcher::{DryRunLauncher, Exit, Launcher, ProcessLauncher};
pub use script::{IssueKind, RunScript, ScriptIssue, ScriptParser};
pub use sequencer::{RunOutcome, RunSummary, Sequencer, Status, LEDGER_COLUMNS};
