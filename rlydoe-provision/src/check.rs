//! Ordering and integrity check of a plan.
use crate::{plan::ProvisionPlan, step::Step};
use std::{collections::HashSet, fmt};

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The plan works but is not reproducible.
    Warning,

    /// The plan fails at this step.
    Error,
}

/// A problem with one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Index of the step, from 0.
    pub step: usize,

    /// Severity.
    pub severity: Severity,

    /// Description.
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "step {}: {}: {}", self.step, severity, self.message)
    }
}

/// Findings on a whole plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Findings in step order.
    pub findings: Vec<Finding>,
}

impl PlanReport {
    /// Walks the steps in order, tracking the tools and files each one leaves.
    pub fn check(plan: &ProvisionPlan) -> Self {
        let mut state = State::new(plan);
        let mut findings = Vec::new();

        for (i, step) in plan.steps.iter().enumerate() {
            let mut report = |severity: Severity, message: String| {
                findings.push(Finding {
                    step: i,
                    severity,
                    message,
                })
            };
            let mut error = |message: String| report(Severity::Error, message);

            for tool in step.required_tools() {
                if !state.tools.contains(tool) {
                    error(format!(
                        "`{}` is needed but neither in the base image nor installed earlier",
                        tool
                    ));
                }
            }

            match step {
                Step::Extract { archive, .. } if !state.produced(archive) => {
                    error(format!("archive {} is not produced by an earlier step", archive))
                }
                Step::InstallConda { installer, .. } if !state.produced(installer) => {
                    error(format!("installer {} is not produced by an earlier step", installer))
                }
                Step::CondaCreate { file } if !state.produced(file) => error(format!(
                    "environment file {} is not produced by an earlier step",
                    file
                )),
                Step::ImportRoms { dir } if !state.extracted(dir) => error(format!(
                    "ROM directory {} is not produced by an earlier extraction",
                    dir
                )),
                Step::Download {
                    url,
                    checksum: None,
                    ..
                } => report(
                    Severity::Warning,
                    format!("download of {} has no checksum", url),
                ),
                _ => {}
            }

            state.apply(step);
        }

        Self { findings }
    }

    /// Findings of severity [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    /// Findings of severity [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    /// No errors; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} error(s), {} warning(s)",
            self.errors().count(),
            self.warnings().count()
        )?;
        for finding in &self.findings {
            writeln!(f, "  {}", finding)?;
        }
        Ok(())
    }
}

/// What the image contains after the steps applied so far.
struct State {
    tools: HashSet<String>,
    files: HashSet<String>,
    trees: Vec<String>,
    workdir: String,
}

impl State {
    fn new(plan: &ProvisionPlan) -> Self {
        Self {
            tools: plan.base_tools.iter().cloned().collect(),
            files: HashSet::new(),
            trees: vec![],
            workdir: "/".to_string(),
        }
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') || path.starts_with('~') {
            normalize(path)
        } else {
            normalize(&format!("{}/{}", self.workdir, path))
        }
    }

    fn extracted(&self, path: &str) -> bool {
        let path = self.resolve(path);
        self.trees
            .iter()
            .any(|t| t == "/" || path == *t || path.starts_with(&format!("{}/", t)))
    }

    fn produced(&self, path: &str) -> bool {
        self.files.contains(&self.resolve(path)) || self.extracted(path)
    }

    fn apply(&mut self, step: &Step) {
        self.tools
            .extend(step.provided_tools().into_iter().map(String::from));

        match step {
            Step::Download { dest, .. } => {
                self.files.insert(self.resolve(dest));
            }
            Step::Extract { dest, .. } => {
                let tree = self.resolve(dest);
                self.trees.push(tree);
            }
            Step::Copy { src, dest } => {
                let is_dir = dest.ends_with('/') || dest == "." || dest == "..";
                let target = if is_dir {
                    let name = src.rsplit('/').next().unwrap_or(src);
                    self.resolve(&format!("{}/{}", dest.trim_end_matches('/'), name))
                } else {
                    self.resolve(dest)
                };
                self.files.insert(target);
            }
            Step::Workdir { path } => self.workdir = self.resolve(path),
            _ => {}
        }
    }
}

/// Removes `.` and `..` segments and repeated slashes.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
