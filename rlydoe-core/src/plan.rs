//! What the trainer does with a resolved configuration.
//!
//! [`TrainingPlan`] mirrors the decisions `trainer-sb3.py` takes before it
//! starts learning: which algorithm and replay buffer are instantiated, where
//! logs, models and videos go, and which callbacks are attached. It is computed
//! without running anything, so a run script can be reviewed up front.
use crate::{
    record::{Record, RecordValue},
    Algorithm, ReplayBufferClass, TrainConfig,
};
use log::{error, warn};
use serde::Serialize;
use std::path::PathBuf;

/// W&B project of `trainer-sb3.py`.
pub const WANDB_PROJECT: &str = "sb3";

/// Periodic video recording of the training environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoPlan {
    /// Output directory.
    pub folder: PathBuf,

    /// A recording starts every this many steps.
    pub trigger_every: u64,

    /// Frames per recording.
    pub length: u64,
}

/// A callback attached to the learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackPlan {
    /// Reports metrics and checkpoints to Weights & Biases.
    Wandb {
        /// Project name.
        project: String,
        /// Gradient logging interval.
        gradient_save_freq: u64,
        /// Checkpoint interval.
        model_save_freq: u64,
        /// Checkpoint directory.
        model_save_path: PathBuf,
        /// Upload tensorboard metrics.
        sync_tensorboard: bool,
        /// Upload videos.
        monitor_gym: bool,
        /// Upload code.
        save_code: bool,
    },

    /// Stops training once the mean evaluation reward reaches a threshold.
    EarlyStopping {
        /// Reward threshold.
        reward_threshold: f64,
        /// Episodes per evaluation.
        n_eval_episodes: u64,
    },
}

/// Decisions of the trainer for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingPlan {
    /// Experiment name.
    pub experiment_name: String,

    /// Learning algorithm.
    pub algorithm: Algorithm,

    /// Policy architecture.
    pub policy_type: String,

    /// Gym environment id.
    pub environment: String,

    /// Training length in environment steps.
    pub total_timesteps: u64,

    /// Replay buffer replacing the default one.
    pub replay_buffer_class: Option<ReplayBufferClass>,

    /// Tensorboard log directory.
    pub tensorboard_log: PathBuf,

    /// Where the final model is saved.
    pub model_path: PathBuf,

    /// Video recording.
    pub video: VideoPlan,

    /// Attached callbacks.
    pub callbacks: Vec<CallbackPlan>,
}

impl TrainingPlan {
    /// Derives the plan of `config` for the experiment `experiment_name`.
    pub fn new(config: &TrainConfig, experiment_name: impl Into<String>) -> Self {
        let experiment_name = experiment_name.into();
        let model_path = PathBuf::from("models").join(&experiment_name);

        let replay_buffer_class = match config.learner.replay_buffer_class {
            Some(class) if !config.learner.name.is_off_policy() => {
                warn!(
                    "Replay buffer class {} is ignored by on-policy learner {}",
                    class.as_str(),
                    config.learner.name
                );
                None
            }
            class => class,
        };

        let mut callbacks = Vec::new();
        if config.callbacks.wandb {
            callbacks.push(CallbackPlan::Wandb {
                project: WANDB_PROJECT.to_string(),
                gradient_save_freq: 100,
                model_save_freq: 1000,
                model_save_path: model_path.clone(),
                sync_tensorboard: config.callbacks.sync_tensorboard,
                monitor_gym: config.callbacks.monitor_gym,
                save_code: config.callbacks.save_code,
            });
        }
        if config.callbacks.early_stopping {
            match config.environment.max_reward {
                Some(reward_threshold) => callbacks.push(CallbackPlan::EarlyStopping {
                    reward_threshold,
                    n_eval_episodes: 100,
                }),
                None => error!(
                    "Early stopping needs environment.max_reward, continuing without it"
                ),
            }
        }

        Self {
            algorithm: config.learner.name,
            policy_type: config.learner.policy_type.clone(),
            environment: config.environment.name.clone(),
            total_timesteps: config.learner.total_timesteps,
            replay_buffer_class,
            tensorboard_log: PathBuf::from("runs").join(&experiment_name),
            model_path,
            video: VideoPlan {
                folder: PathBuf::from("videos"),
                trigger_every: 2000,
                length: 200,
            },
            callbacks,
            experiment_name,
        }
    }

    /// Summary of the plan as a record.
    pub fn to_record(&self) -> Record {
        let mut record = Record::empty();
        record.insert(
            "experiment_name",
            RecordValue::String(self.experiment_name.clone()),
        );
        record.insert(
            "algorithm",
            RecordValue::String(self.algorithm.as_str().to_uppercase()),
        );
        record.insert("environment", RecordValue::String(self.environment.clone()));
        // f32 scalars lose step counts above 2^24
        record.insert(
            "total_timesteps",
            RecordValue::String(self.total_timesteps.to_string()),
        );
        if let Some(class) = self.replay_buffer_class {
            record.insert(
                "replay_buffer_class",
                RecordValue::String(class.class_name().to_string()),
            );
        }
        record
    }
}
