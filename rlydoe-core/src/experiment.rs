//! Experiment names used for tracking and output directories.
use crate::TrainConfig;
use chrono::{DateTime, Local};

/// Value of `callbacks.experiment_name` asking for a generated name.
pub const GENERATED_EXPERIMENT_NAME: &str = "default";

/// Returns the name of the experiment described by `config`.
///
/// A configured name is used as is. Otherwise the name is
/// `<environment>_<YYYY-mm-dd-HH:MM:SS>_<ALGORITHM>`.
pub fn experiment_name(config: &TrainConfig, now: &DateTime<Local>) -> String {
    if config.callbacks.experiment_name != GENERATED_EXPERIMENT_NAME {
        return config.callbacks.experiment_name.clone();
    }
    format!(
        "{}_{}_{}",
        config.environment.name,
        now.format("%Y-%m-%d-%H:%M:%S"),
        config.learner.name.as_str().to_uppercase()
    )
}
