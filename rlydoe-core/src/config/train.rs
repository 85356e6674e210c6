//! Configuration of `trainer-sb3.py`.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::Path,
    str::FromStr,
};

/// Learning algorithm understood by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Proximal policy optimization.
    Ppo,

    /// Soft actor critic.
    Sac,
}

impl Algorithm {
    /// Lower-case name as used in presets and overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ppo => "ppo",
            Self::Sac => "sac",
        }
    }

    /// Whether the algorithm learns from a replay buffer.
    pub fn is_off_policy(&self) -> bool {
        matches!(self, Self::Sac)
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ppo" => Ok(Self::Ppo),
            "sac" => Ok(Self::Sac),
            _ => Err(format!("unknown learner `{}`, expected ppo or sac", s)),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replay buffer class swapped into off-policy learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReplayBufferClass {
    /// Hindsight experience replay.
    Her,
}

impl ReplayBufferClass {
    /// Name as used in overrides.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Her => "her",
        }
    }

    /// Class name on the trainer side.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Her => "HerReplayBuffer",
        }
    }
}

impl FromStr for ReplayBufferClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "her" => Ok(Self::Her),
            _ => Err(format!("unknown replay buffer class `{}`, expected her", s)),
        }
    }
}

impl TryFrom<String> for ReplayBufferClass {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReplayBufferClass> for String {
    fn from(value: ReplayBufferClass) -> Self {
        value.as_str().to_string()
    }
}

/// The `learner` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LearnerConfig {
    /// Algorithm.
    pub name: Algorithm,

    /// Policy architecture tag, e.g. `MlpPolicy`.
    pub policy_type: String,

    /// Number of environment steps to train for.
    pub total_timesteps: u64,

    /// Replay buffer class, absent for the default buffer.
    pub replay_buffer_class: Option<ReplayBufferClass>,
}

impl LearnerConfig {
    /// A learner with `MlpPolicy` trained for one million steps.
    pub fn new(name: Algorithm) -> Self {
        Self {
            name,
            policy_type: "MlpPolicy".to_string(),
            total_timesteps: 1_000_000,
            replay_buffer_class: None,
        }
    }

    /// Sets the policy architecture.
    pub fn policy_type(mut self, v: impl Into<String>) -> Self {
        self.policy_type = v.into();
        self
    }

    /// Sets the number of training steps.
    pub fn total_timesteps(mut self, v: u64) -> Self {
        self.total_timesteps = v;
        self
    }

    /// Sets the replay buffer class.
    pub fn replay_buffer_class(mut self, v: Option<ReplayBufferClass>) -> Self {
        self.replay_buffer_class = v;
        self
    }
}

/// The `environment` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Gym environment id.
    pub name: String,

    /// Reward at which early stopping ends training.
    pub max_reward: Option<f64>,
}

impl EnvironmentConfig {
    /// An environment without a reward threshold.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_reward: None,
        }
    }

    /// Sets the reward threshold.
    pub fn max_reward(mut self, v: f64) -> Self {
        self.max_reward = Some(v);
        self
    }
}

/// The `callbacks` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbacksConfig {
    /// Report to Weights & Biases.
    pub wandb: bool,

    /// Name of the experiment, `default` to generate one.
    pub experiment_name: String,

    /// Upload tensorboard metrics to W&B.
    pub sync_tensorboard: bool,

    /// Upload recorded videos to W&B.
    pub monitor_gym: bool,

    /// Upload the training code to W&B.
    pub save_code: bool,

    /// Stop once the evaluation reward reaches `environment.max_reward`.
    pub early_stopping: bool,
}

impl Default for CallbacksConfig {
    fn default() -> Self {
        Self {
            wandb: true,
            experiment_name: crate::experiment::GENERATED_EXPERIMENT_NAME.to_string(),
            sync_tensorboard: true,
            monitor_gym: true,
            save_code: true,
            early_stopping: false,
        }
    }
}

impl CallbacksConfig {
    /// No reporting to external services.
    pub fn offline() -> Self {
        Self {
            wandb: false,
            sync_tensorboard: false,
            monitor_gym: false,
            save_code: false,
            ..Self::default()
        }
    }
}

/// Configuration of one `trainer-sb3.py` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    /// Learner section.
    pub learner: LearnerConfig,

    /// Environment section.
    pub environment: EnvironmentConfig,

    /// Callback section.
    pub callbacks: CallbacksConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learner: LearnerConfig::new(Algorithm::Ppo),
            environment: EnvironmentConfig::new("CartPole-v1").max_reward(475.0),
            callbacks: CallbacksConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Constructs [`TrainConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_algorithm_names() {
        assert_eq!("PPO".parse::<Algorithm>(), Ok(Algorithm::Ppo));
        assert_eq!("sac".parse::<Algorithm>(), Ok(Algorithm::Sac));
        assert!("dqn".parse::<Algorithm>().is_err());
        assert!(Algorithm::Sac.is_off_policy());
        assert!(!Algorithm::Ppo.is_off_policy());
    }

    #[test]
    fn test_serde_train_config() -> Result<()> {
        let config = TrainConfig {
            learner: LearnerConfig::new(Algorithm::Sac)
                .policy_type("MultiInputPolicy")
                .replay_buffer_class(Some(ReplayBufferClass::Her)),
            environment: EnvironmentConfig::new("FetchReach-v1"),
            callbacks: CallbacksConfig::offline(),
        };

        let dir = TempDir::new("train_config")?;
        let path = dir.path().join("train_config.yaml");
        config.save(&path)?;
        let config_ = TrainConfig::load(&path)?;
        assert_eq!(config, config_);

        let yaml = serde_yaml::to_string(&config)?;
        assert!(yaml.contains("name: sac"));
        assert!(yaml.contains("replay_buffer_class: her"));
        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "name: ppo\npolicy_type: MlpPolicy\ntotal_timesteps: 10\n\
                    replay_buffer_class: ~\nlearning_rate: 0.1\n";
        assert!(serde_yaml::from_str::<LearnerConfig>(yaml).is_err());
    }
}
