//! Configuration of [`Sequencer`](crate::Sequencer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`Sequencer`](crate::Sequencer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    /// Skips the remaining invocations after the first failure.
    ///
    /// `set -e` in the script has the same effect.
    pub stop_on_error: bool,

    /// Rejects scripts with a stray continuation.
    pub strict: bool,

    /// Logs invocations without launching them.
    pub dry_run: bool,

    /// Working directory of launched programs.
    pub workdir: Option<PathBuf>,

    /// Directory of preset files, `<conf_dir>/<group>/<preset>.yaml`.
    pub conf_dir: Option<PathBuf>,

    /// CSV file receiving one row per invocation.
    pub ledger: Option<PathBuf>,

    /// Variables passed to every launched program and visible in the script.
    pub env: BTreeMap<String, String>,
}

impl SequencerConfig {
    /// Sets stop-on-error.
    pub fn stop_on_error(mut self, v: bool) -> Self {
        self.stop_on_error = v;
        self
    }

    /// Sets strict parsing.
    pub fn strict(mut self, v: bool) -> Self {
        self.strict = v;
        self
    }

    /// Sets dry-run mode.
    pub fn dry_run(mut self, v: bool) -> Self {
        self.dry_run = v;
        self
    }

    /// Sets the working directory of launched programs.
    pub fn workdir(mut self, v: impl Into<PathBuf>) -> Self {
        self.workdir = Some(v.into());
        self
    }

    /// Sets the directory of preset files.
    pub fn conf_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.conf_dir = Some(v.into());
        self
    }

    /// Sets the run ledger.
    pub fn ledger(mut self, v: impl Into<PathBuf>) -> Self {
        self.ledger = Some(v.into());
        self
    }

    /// Adds a variable.
    pub fn env(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.env.insert(k.into(), v.into());
        self
    }

    /// Constructs [`SequencerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SequencerConfig`].
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
    fn test_serde_sequencer_config() -> Result<()> {
        let config = SequencerConfig::default()
            .stop_on_error(true)
            .workdir("diary/src")
            .ledger("runs.csv")
            .env("CUDA_VISIBLE_DEVICES", "0");

        let dir = TempDir::new("sequencer_config")?;
        let path = dir.path().join("sequencer.yaml");
        config.save(&path)?;
        assert_eq!(SequencerConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_yaml() {
        let config: SequencerConfig = serde_yaml::from_str("dry_run: true\n").unwrap();
        assert_eq!(config, SequencerConfig::default().dry_run(true));
        assert!(serde_yaml::from_str::<SequencerConfig>("retries: 3\n").is_err());
    }
}
