//! Named presets and resolution of `trainer-sb3.py` command lines.
use super::{
    resolved::{push_key, ResolvedConfig},
    Algorithm, CallbacksConfig, EnvironmentConfig, LearnerConfig, TrainConfig,
};
use crate::{
    error::ConfigError,
    overrides::{apply_overrides, Override},
};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

/// A section of [`TrainConfig`] selectable by preset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    /// `learner=<preset>`
    Learner,

    /// `environment=<preset>`
    Environment,

    /// `callbacks=<preset>`
    Callbacks,
}

impl Group {
    /// All groups in the order they appear in [`TrainConfig`].
    pub const ALL: [Group; 3] = [Group::Learner, Group::Environment, Group::Callbacks];

    /// Name of the group on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Environment => "environment",
            Self::Callbacks => "callbacks",
        }
    }
}

impl FromStr for Group {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(Self::Learner),
            "environment" => Ok(Self::Environment),
            "callbacks" => Ok(Self::Callbacks),
            _ => Err(ConfigError::UnknownKey(s.to_string())),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presets available to `learner=`, `environment=` and `callbacks=`.
///
/// [`PresetCatalog::default()`] holds the built-in presets. Presets can be
/// added from a directory laid out as `<dir>/<group>/<preset>.yaml`, where each
/// file is a complete section of [`TrainConfig`].
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    learners: BTreeMap<String, LearnerConfig>,
    environments: BTreeMap<String, EnvironmentConfig>,
    callbacks: BTreeMap<String, CallbacksConfig>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.insert_learner("ppo", LearnerConfig::new(Algorithm::Ppo));
        catalog.insert_learner("sac", LearnerConfig::new(Algorithm::Sac));
        catalog.insert_environment(
            "cartpole",
            EnvironmentConfig::new("CartPole-v1").max_reward(475.0),
        );
        catalog.insert_environment(
            "lunarlander",
            EnvironmentConfig::new("LunarLander-v2").max_reward(200.0),
        );
        catalog.insert_environment("atari", EnvironmentConfig::new("BreakoutNoFrameskip-v4"));
        catalog.insert_environment("fetchreach", EnvironmentConfig::new("FetchReach-v1"));
        catalog.insert_environment(
            "fetchpickplace",
            EnvironmentConfig::new("FetchPickAndPlace-v1"),
        );
        catalog.insert_callbacks("default", CallbacksConfig::default());
        catalog.insert_callbacks("offline", CallbacksConfig::offline());
        catalog
    }
}

impl PresetCatalog {
    /// Learner preset used when none is selected.
    pub const DEFAULT_LEARNER: &'static str = "ppo";

    /// Environment preset used when none is selected.
    pub const DEFAULT_ENVIRONMENT: &'static str = "cartpole";

    /// Callbacks preset used when none is selected.
    pub const DEFAULT_CALLBACKS: &'static str = "default";

    /// A catalog without any preset.
    pub fn empty() -> Self {
        Self {
            learners: BTreeMap::new(),
            environments: BTreeMap::new(),
            callbacks: BTreeMap::new(),
        }
    }

    /// Adds or replaces a learner preset.
    pub fn insert_learner(&mut self, name: impl Into<String>, config: LearnerConfig) {
        self.learners.insert(name.into(), config);
    }

    /// Adds or replaces an environment preset.
    pub fn insert_environment(&mut self, name: impl Into<String>, config: EnvironmentConfig) {
        self.environments.insert(name.into(), config);
    }

    /// Adds or replaces a callbacks preset.
    pub fn insert_callbacks(&mut self, name: impl Into<String>, config: CallbacksConfig) {
        self.callbacks.insert(name.into(), config);
    }

    /// Names of the presets of a group, sorted.
    pub fn names(&self, group: Group) -> Vec<&str> {
        match group {
            Group::Learner => self.learners.keys().map(String::as_str).collect(),
            Group::Environment => self.environments.keys().map(String::as_str).collect(),
            Group::Callbacks => self.callbacks.keys().map(String::as_str).collect(),
        }
    }

    /// Whether the group has a preset of this name.
    pub fn contains(&self, group: Group, name: &str) -> bool {
        match group {
            Group::Learner => self.learners.contains_key(name),
            Group::Environment => self.environments.contains_key(name),
            Group::Callbacks => self.callbacks.contains_key(name),
        }
    }

    /// Adds the presets found under `dir`, replacing built-ins of the same name.
    ///
    /// Missing group directories are skipped.
    pub fn load_dir(mut self, dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        for group in Group::ALL {
            let group_dir = dir.as_ref().join(group.as_str());
            if !group_dir.is_dir() {
                debug!("No preset directory {:?}", group_dir);
                continue;
            }
            for (name, path) in preset_files(&group_dir)? {
                match group {
                    Group::Learner => self.insert_learner(name.clone(), read_preset(&path)?),
                    Group::Environment => {
                        self.insert_environment(name.clone(), read_preset(&path)?)
                    }
                    Group::Callbacks => self.insert_callbacks(name.clone(), read_preset(&path)?),
                }
                info!("Loaded preset {}={} from {:?}", group, name, path);
            }
        }
        Ok(self)
    }

    fn preset<'a, T: Clone>(
        presets: &'a BTreeMap<String, T>,
        group: Group,
        name: &str,
    ) -> Result<&'a T, ConfigError> {
        presets.get(name).ok_or_else(|| ConfigError::UnknownPreset {
            group: group.to_string(),
            name: name.to_string(),
        })
    }

    /// Builds the base configuration from one preset of each group.
    pub fn base(
        &self,
        learner: &str,
        environment: &str,
        callbacks: &str,
    ) -> Result<TrainConfig, ConfigError> {
        Ok(TrainConfig {
            learner: Self::preset(&self.learners, Group::Learner, learner)?.clone(),
            environment: Self::preset(&self.environments, Group::Environment, environment)?
                .clone(),
            callbacks: Self::preset(&self.callbacks, Group::Callbacks, callbacks)?.clone(),
        })
    }

    /// Resolves the arguments of a `trainer-sb3.py` invocation.
    ///
    /// Preset selections (`learner=sac`) are applied first, the last one of a
    /// group winning. Dotted overrides are then applied in order, so a later
    /// key replaces an earlier one.
    pub fn resolve<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<ResolvedConfig<TrainConfig>, ConfigError> {
        let mut selected: BTreeMap<Group, String> = BTreeMap::new();
        let mut presets = Vec::new();
        let mut overrides = Vec::new();
        let mut keys = Vec::new();

        for arg in args {
            let o = Override::parse(arg.as_ref())?;
            push_key(&mut keys, o.key.to_string());
            if o.key.len() == 1 {
                if let Ok(group) = o.key.first().parse::<Group>() {
                    let name = o.raw_value().to_string();
                    if !self.contains(group, &name) {
                        return Err(ConfigError::UnknownPreset {
                            group: group.to_string(),
                            name,
                        });
                    }
                    selected.insert(group, name.clone());
                    presets.push((group, name));
                    continue;
                }
            }
            overrides.push(o);
        }

        let choice = |group: Group, default: &'static str| {
            selected
                .get(&group)
                .map(String::as_str)
                .unwrap_or(default)
        };
        let base = self.base(
            choice(Group::Learner, Self::DEFAULT_LEARNER),
            choice(Group::Environment, Self::DEFAULT_ENVIRONMENT),
            choice(Group::Callbacks, Self::DEFAULT_CALLBACKS),
        )?;
        let config = apply_overrides(&base, &overrides)?;

        Ok(ResolvedConfig::new(config, presets, overrides, keys))
    }
}

fn preset_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ConfigError> {
    let io_err = |e: std::io::Error| ConfigError::PresetFile {
        path: dir.display().to_string(),
        reason: e.to_string(),
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if let (true, Some(stem)) = (is_yaml, path.file_stem().and_then(|s| s.to_str())) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn read_preset<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let err = |reason: String| ConfigError::PresetFile {
        path: path.display().to_string(),
        reason,
    };
    let file = File::open(path).map_err(|e| err(e.to_string()))?;
    serde_yaml::from_reader(BufReader::new(file)).map_err(|e| err(e.to_string()))
}
