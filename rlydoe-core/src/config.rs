//! Configurations accepted by the external training scripts.
//!
//! * [`TrainConfig`] is the configuration of `trainer-sb3.py`, assembled from
//!   presets held in a [`PresetCatalog`] and dotted overrides.
//! * [`PpgConfig`] holds the hyperparameters of the standalone `ppg.py`
//!   script, which takes flat `--key=value` flags.
mod ppg;
mod preset;
mod resolved;
mod train;

pub use ppg::PpgConfig;
pub use preset::{Group, PresetCatalog};
pub use resolved::ResolvedConfig;
pub use train::{
    Algorithm, CallbacksConfig, EnvironmentConfig, LearnerConfig, ReplayBufferClass,
    TrainConfig,
};
