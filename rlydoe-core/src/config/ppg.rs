//! Hyperparameters of the phasic policy gradient script, `ppg.py`.
use super::resolved::{push_key, ResolvedConfig};
use crate::{
    error::ConfigError,
    overrides::{apply_overrides, Override},
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Hyperparameters of `ppg.py`, with the script's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PpgConfig {
    /// Gym environment id.
    pub env_name: String,
    /// Number of training episodes.
    pub num_episodes: u64,
    /// Step limit per episode.
    pub max_timesteps: u64,
    /// Hidden width of the actor network.
    pub actor_hidden_dim: u64,
    /// Hidden width of the critic network.
    pub critic_hidden_dim: u64,
    /// Minibatch size of policy and auxiliary updates.
    pub minibatch_size: u64,
    /// Adam learning rate.
    pub lr: f64,
    /// Adam betas.
    pub betas: [f64; 2],
    /// GAE lambda.
    pub lam: f64,
    /// Discount factor.
    pub gamma: f64,
    /// PPO ratio clip.
    pub eps_clip: f64,
    /// Value loss clip.
    pub value_clip: f64,
    /// Entropy bonus weight.
    pub beta_s: f64,
    /// Environment steps between policy updates.
    pub update_timesteps: u64,
    /// Policy updates between auxiliary phases.
    pub num_policy_updates_per_aux: u64,
    /// Epochs per policy phase.
    pub epochs: u64,
    /// Epochs per auxiliary phase.
    pub epochs_aux: u64,
    /// Random seed, unseeded when absent.
    pub seed: Option<u64>,
    /// Render episodes.
    pub render: bool,
    /// Render one episode out of this many.
    pub render_every_eps: u64,
    /// Save the model every this many episodes.
    pub save_every: u64,
    /// Load a saved model before training.
    pub load: bool,
    /// Wrap the environment in a video monitor.
    pub monitor: bool,
    /// Report to Weights & Biases.
    pub wandb_save: bool,
}

impl Default for PpgConfig {
    fn default() -> Self {
        Self {
            env_name: "LunarLander-v2".to_string(),
            num_episodes: 50000,
            max_timesteps: 500,
            actor_hidden_dim: 32,
            critic_hidden_dim: 256,
            minibatch_size: 64,
            lr: 0.0005,
            betas: [0.9, 0.999],
            lam: 0.95,
            gamma: 0.99,
            eps_clip: 0.2,
            value_clip: 0.4,
            beta_s: 0.01,
            update_timesteps: 5000,
            num_policy_updates_per_aux: 32,
            epochs: 1,
            epochs_aux: 6,
            seed: None,
            render: false,
            render_every_eps: 250,
            save_every: 1000,
            load: false,
            monitor: false,
            wandb_save: false,
        }
    }
}

impl PpgConfig {
    /// W&B project the script reports to.
    pub const WANDB_PROJECT: &'static str = "ppg-experiments";

    /// Resolves `--key=value` flags (or `--key value`, or a bare `--flag`)
    /// against the defaults.
    pub fn resolve<S: AsRef<str>>(args: &[S]) -> Result<ResolvedConfig<Self>, ConfigError> {
        let mut overrides = Vec::new();
        let mut keys = Vec::new();
        let mut args = args.iter().map(AsRef::as_ref).peekable();

        while let Some(arg) = args.next() {
            let o = match args.peek() {
                Some(next)
                    if arg.starts_with("--") && !arg.contains('=') && !next.starts_with("--") =>
                {
                    let o = Override::parse_flag(&format!("{}={}", arg, next))?;
                    args.next();
                    o
                }
                _ => Override::parse_flag(arg)?,
            };
            push_key(&mut keys, o.key.to_string());
            overrides.push(o);
        }

        let config = apply_overrides(&Self::default(), &overrides)?;
        Ok(ResolvedConfig::new(config, vec![], overrides, keys))
    }

    /// `<env_name>_<timestamp>`, the name of the tensorboard run directory.
    pub fn experiment_name(&self, now: &DateTime<Local>) -> String {
        format!("{}_{}", self.env_name, now.format("%Y_%m_%d_%H_%M_%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ppg_flags() {
        let resolved = PpgConfig::resolve(&[
            "--env_name=CartPole-v1",
            "--lr",
            "0.001",
            "--render",
            "--seed=7",
            "--betas=(0.8,0.99)",
        ])
        .unwrap();
        let config = &resolved.config;
        assert_eq!(config.env_name, "CartPole-v1");
        assert_eq!(config.lr, 0.001);
        assert!(config.render);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.betas, [0.8, 0.99]);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(
            resolved.keys(),
            vec!["env_name", "lr", "render", "seed", "betas"]
        );
    }

    #[test]
    fn test_ppg_rejects_unknown_flag() {
        assert_eq!(
            PpgConfig::resolve(&["--learning_rate=0.1"]).unwrap_err(),
            ConfigError::UnknownKey("learning_rate".into())
        );
        assert!(PpgConfig::resolve(&["--epochs=one"]).is_err());
        assert!(PpgConfig::resolve(&["positional"]).is_err());
    }

    #[test]
    fn test_ppg_experiment_name() {
        let now = Local.with_ymd_and_hms(2021, 6, 1, 13, 5, 9).unwrap();
        assert_eq!(
            PpgConfig::default().experiment_name(&now),
            "LunarLander-v2_2021_06_01_13_05_09"
        );
    }
}
