//! Provisioning plans and their sources.
use crate::{dockerfile, step::Step};
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
};

/// Tools assumed present in a Debian-like base image.
pub const DEFAULT_BASE_TOOLS: [&str; 4] = ["sh", "bash", "tar", "apt-get"];

fn default_base_tools() -> Vec<String> {
    DEFAULT_BASE_TOOLS.iter().map(|s| s.to_string()).collect()
}

/// An ordered list of steps on top of a base image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionPlan {
    /// Image the steps start from.
    pub base_image: String,

    /// Programs the base image provides.
    #[serde(default = "default_base_tools")]
    pub base_tools: Vec<String>,

    /// Steps in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ProvisionPlan {
    /// An empty plan on `base_image`.
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            base_tools: default_base_tools(),
            steps: vec![],
        }
    }

    /// Appends a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Replaces the tools of the base image.
    pub fn base_tools<S: Into<String>>(mut self, tools: impl IntoIterator<Item = S>) -> Self {
        self.base_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Constructs [`ProvisionPlan`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ProvisionPlan`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Reads a plan from a YAML file (`.yaml`, `.yml`) or a Dockerfile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let plan = if is_yaml {
            Self::load(path).with_context(|| format!("Failed to load plan {:?}", path))?
        } else {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            dockerfile::parse(&text).with_context(|| format!("Failed to parse {:?}", path))?
        };
        info!(
            "Loaded {} steps on {} from {:?}",
            plan.steps.len(),
            plan.base_image,
            path
        );
        Ok(plan)
    }

    /// The plan as a Dockerfile.
    pub fn to_dockerfile(&self) -> String {
        dockerfile::render(self)
    }
}
