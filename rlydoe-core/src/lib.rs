#![warn(missing_docs)]
//! Typed configuration for training runs launched from the experiment diary.
//!
//! The external trainer (`trainer-sb3.py`) takes its configuration as a base
//! built from named presets plus dotted overrides on the command line:
//!
//! ```text
//! trainer-sb3.py learner=ppo environment=fetchpickplace \
//!     learner.policy_type=MultiInputPolicy learner.total_timesteps=40000000
//! ```
//!
//! This crate models that configuration with explicit types, so that a bad
//! key path or an ill-typed value is rejected before any process is launched.
//!
//! ```rust
//! use rlydoe_core::{PresetCatalog, TrainConfig};
//!
//! let catalog = PresetCatalog::default();
//! let resolved = catalog
//!     .resolve(&["learner=sac", "learner.replay_buffer_class=her"])
//!     .unwrap();
//! assert_eq!(resolved.config.learner.name.as_str(), "sac");
//! assert_eq!(resolved.keys(), vec!["learner", "learner.replay_buffer_class"]);
//! ```
pub mod config;
pub mod error;
pub mod experiment;
pub mod overrides;
pub mod plan;
pub mod record;

pub use config::{
    Algorithm, CallbacksConfig, EnvironmentConfig, Group, LearnerConfig, PpgConfig,
    PresetCatalog, ReplayBufferClass, ResolvedConfig, TrainConfig,
};
pub use error::{ConfigError, RecordError};
pub use experiment::experiment_name;
pub use overrides::{apply_overrides, KeyPath, Override, OverrideValue};
pub use plan::{CallbackPlan, TrainingPlan};
